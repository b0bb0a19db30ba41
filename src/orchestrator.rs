//! Scoring orchestrator: one shared extractor + scorer behind two output contracts.
//!
//! - [`ScoringOrchestrator::analyze_log`]: correlation verdict, used by streaming ingestion.
//! - [`ScoringOrchestrator::score_threat`]: probability score and ALLOW/ALERT/BLOCK decision,
//!   used by the request/response entry point.
//! - [`ScoringOrchestrator::evaluate`]: both of the above plus the enforcement action, from a
//!   single extraction.
//!
//! An event is recorded into its source's history once, whichever entry points see it.
//! Scorer failures never reach the caller.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::events::{Event, RawEvent};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::intel::ThreatFeed;
use crate::model::{self, call_with_timeout, AnomalyScorer, ProbabilityScore};
use crate::risk::{
    round2, Action, DecisionEngine, Prediction, RiskAssessment, RiskCorrelator, ResponseProfile,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const MALICIOUS_CUTOFF: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            ThreatLevel::High
        } else if score >= 40.0 {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreDecision {
    Allow,
    Alert,
    Block,
}

impl ScoreDecision {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ScoreDecision::Block
        } else if score >= 50.0 {
            ScoreDecision::Alert
        } else {
            ScoreDecision::Allow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 0–100
    pub score: f64,
    pub threat_level: ThreatLevel,
    /// 0–1
    pub confidence: f64,
    pub decision: ScoreDecision,
}

impl ScoreResult {
    pub fn from_probability(p: ProbabilityScore) -> Self {
        let score = p.malicious_probability * 100.0;
        Self {
            score: round2(score),
            threat_level: ThreatLevel::from_score(score),
            confidence: round2(p.confidence),
            decision: ScoreDecision::from_score(score),
        }
    }

    /// Returned whenever the scorer is unavailable, fails or times out.
    pub fn safe_default() -> Self {
        Self {
            score: 0.0,
            threat_level: ThreatLevel::Low,
            confidence: 0.0,
            decision: ScoreDecision::Allow,
        }
    }
}

/// Combined output for one event.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub event_id: String,
    pub source_addr: String,
    pub risk: RiskAssessment,
    pub score: ScoreResult,
    pub action: Action,
    pub response: ResponseProfile,
}

pub struct ScoringOrchestrator {
    extractor: Arc<FeatureExtractor>,
    scorer: Arc<dyn AnomalyScorer>,
    correlator: RiskCorrelator,
    decision: DecisionEngine,
    scorer_timeout: Duration,
    idle_ttl: Duration,
    sweep_interval: Duration,
}

impl ScoringOrchestrator {
    pub fn new(config: &PipelineConfig, scorer: Arc<dyn AnomalyScorer>, feed: ThreatFeed) -> Self {
        let extractor = Arc::new(FeatureExtractor::new(config.features.clone()));
        let scorer_timeout = Duration::from_millis(config.scorer.timeout_ms.max(1));
        let correlator = RiskCorrelator::new(
            Arc::clone(&extractor),
            Arc::clone(&scorer),
            Arc::new(feed),
            scorer_timeout,
        );
        Self {
            extractor,
            scorer,
            correlator,
            decision: DecisionEngine::new(config.decision),
            scorer_timeout,
            idle_ttl: Duration::from_secs(config.features.idle_ttl_secs),
            sweep_interval: Duration::from_secs(config.features.sweep_interval_secs.max(1)),
        }
    }

    /// Build scorer and feed from the paths in `config`, degrading when either is missing.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let scorer = model::load_scorer(&config.scorer);
        let feed = match &config.feed.path {
            Some(path) => ThreatFeed::load_or_empty(path),
            None => ThreatFeed::new(),
        };
        Self::new(config, scorer, feed)
    }

    pub fn extractor(&self) -> &Arc<FeatureExtractor> {
        &self.extractor
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Correlation path. Shares the extraction with [`score_threat`](Self::score_threat) for
    /// the same event id.
    pub async fn analyze_log(&self, event: &Event) -> RiskAssessment {
        self.correlator.correlate(event).await
    }

    /// Probability path.
    pub async fn score_threat(&self, event: &Event) -> ScoreResult {
        let features = self.extractor.extract(event);
        match self.probability(event, &features).await {
            Some(p) => ScoreResult::from_probability(p),
            None => ScoreResult::safe_default(),
        }
    }

    /// Both paths and the enforcement action over one extraction.
    pub async fn evaluate(&self, event: &Event) -> Evaluation {
        let features = self.extractor.extract(event);
        let (risk, probability) = tokio::join!(
            self.correlator.correlate_features(event, &features),
            self.probability(event, &features)
        );

        let score = probability.map_or_else(ScoreResult::safe_default, ScoreResult::from_probability);
        let p = probability.unwrap_or_default();
        let anomaly_score = if risk.details.is_anomaly {
            model::unit(risk.details.anomaly_magnitude)
        } else {
            0.0
        };
        let threat_score = model::unit(risk.total_risk_score / 100.0);
        let action = self.decision.decide(
            Prediction::from(p.malicious_probability >= MALICIOUS_CUTOFF),
            p.confidence,
            anomaly_score,
            threat_score,
        );

        debug!(
            event_id = %event.id,
            source = %event.source_addr,
            verdict = ?risk.verdict,
            total = risk.total_risk_score,
            score = score.score,
            action = ?action,
            "event evaluated"
        );

        Evaluation {
            event_id: event.id.clone(),
            source_addr: event.source_addr.clone(),
            risk,
            score,
            action,
            response: action.response(),
        }
    }

    /// Validate a collaborator-supplied event, then [`evaluate`](Self::evaluate) it.
    pub async fn ingest_raw(&self, raw: RawEvent) -> Result<Evaluation> {
        let event = Event::try_from(raw)?;
        Ok(self.evaluate(&event).await)
    }

    /// Drop sources idle longer than the configured TTL.
    pub fn sweep_once(&self) -> usize {
        self.extractor.evict_idle(self.idle_ttl)
    }

    /// Periodic idle-source eviction on the tokio runtime. Abort the handle to stop it.
    pub fn spawn_eviction_sweep(&self) -> JoinHandle<()> {
        let extractor = Arc::clone(&self.extractor);
        let ttl = self.idle_ttl;
        let every = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = extractor.evict_idle(ttl);
                if evicted > 0 {
                    info!(evicted, tracked = extractor.tracked_sources(), "idle sources evicted");
                }
            }
        })
    }

    async fn probability(&self, event: &Event, features: &FeatureVector) -> Option<ProbabilityScore> {
        match call_with_timeout(self.scorer_timeout, self.scorer.score_probability(features)).await {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(event_id = %event.id, scorer = self.scorer.name(), error = %e, "probability unavailable; safe default");
                None
            }
        }
    }
}
