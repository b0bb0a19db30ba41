//! Fuses anomaly, signature and feed signals into one risk score and verdict.
//! Weights: anomaly 20%, signatures 30%, feed 50%.

use crate::events::Event;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::intel::ThreatFeed;
use crate::model::{call_with_timeout, AnomalyScore, AnomalyScorer};
use crate::signatures::{Signature, SignatureEngine, SignatureMatch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const AI_WEIGHT: f64 = 0.2;
const RULE_WEIGHT: f64 = 0.3;
const FEED_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    Warning,
    High,
    Critical,
}

impl Verdict {
    /// Strict thresholds: exactly 50 is `Warning`, not `High`.
    pub fn from_score(total: f64) -> Self {
        if total > 80.0 {
            Verdict::Critical
        } else if total > 50.0 {
            Verdict::High
        } else if total > 20.0 {
            Verdict::Warning
        } else {
            Verdict::Safe
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDetails {
    pub is_anomaly: bool,
    pub anomaly_magnitude: f64,
    pub matched_signatures: Vec<Signature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_match: Option<String>,
    pub ai_risk: f64,
    pub rule_risk: f64,
    pub feed_risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub verdict: Verdict,
    /// Weighted total, rounded to 2 decimals after the verdict is taken from the exact value.
    /// Not clamped; stacked signatures can exceed 100.
    pub total_risk_score: f64,
    pub details: RiskDetails,
}

impl RiskAssessment {
    /// Pure fusion step. `feed_match` is the category label of a feed hit.
    pub fn fuse(anomaly: AnomalyScore, signatures: SignatureMatch, feed_match: Option<String>) -> Self {
        let ai_risk = if anomaly.is_anomaly {
            anomaly.magnitude.abs() * 100.0
        } else {
            0.0
        };
        let rule_risk = signatures.risk as f64;
        let feed_risk = if feed_match.is_some() {
            crate::intel::FEED_HIT_RISK
        } else {
            0.0
        };
        let total = ai_risk * AI_WEIGHT + rule_risk * RULE_WEIGHT + feed_risk * FEED_WEIGHT;

        RiskAssessment {
            verdict: Verdict::from_score(total),
            total_risk_score: round2(total),
            details: RiskDetails {
                is_anomaly: anomaly.is_anomaly,
                anomaly_magnitude: anomaly.magnitude,
                matched_signatures: signatures.signatures,
                feed_match,
                ai_risk,
                rule_risk,
                feed_risk,
            },
        }
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub struct RiskCorrelator {
    extractor: Arc<FeatureExtractor>,
    scorer: Arc<dyn AnomalyScorer>,
    signatures: SignatureEngine,
    feed: Arc<ThreatFeed>,
    scorer_timeout: Duration,
}

impl RiskCorrelator {
    pub fn new(
        extractor: Arc<FeatureExtractor>,
        scorer: Arc<dyn AnomalyScorer>,
        feed: Arc<ThreatFeed>,
        scorer_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            scorer,
            signatures: SignatureEngine::new(),
            feed,
            scorer_timeout,
        }
    }

    /// Extract features for `event` (mutating its source state) and correlate.
    pub async fn correlate(&self, event: &Event) -> RiskAssessment {
        let features = self.extractor.extract(event);
        self.correlate_features(event, &features).await
    }

    /// Correlate using a vector already extracted for `event`. Does not touch source state.
    pub async fn correlate_features(&self, event: &Event, features: &FeatureVector) -> RiskAssessment {
        let anomaly = self.anomaly(event, features).await;
        let signatures = self.signatures.check(event);
        let feed_match = self.feed.lookup(&event.source_addr).map(str::to_string);
        RiskAssessment::fuse(anomaly, signatures, feed_match)
    }

    /// Scorer failures and timeouts count as "no anomaly".
    pub(crate) async fn anomaly(&self, event: &Event, features: &FeatureVector) -> AnomalyScore {
        match call_with_timeout(self.scorer_timeout, self.scorer.score(features)).await {
            Ok(a) => a,
            Err(e) => {
                warn!(event_id = %event.id, scorer = self.scorer.name(), error = %e, "anomaly score unavailable");
                AnomalyScore::default()
            }
        }
    }
}
