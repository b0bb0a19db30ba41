//! Anomaly scorer interface and bundled implementations.
//!
//! The pipeline only sees [`AnomalyScorer`]; any model (heuristic stub, logistic weights on
//! disk, a remote inference service) plugs in behind `Arc<dyn AnomalyScorer>`.

mod heuristic;
mod logistic;

pub use heuristic::HeuristicScorer;
pub use logistic::LogisticScorer;

use crate::config::ScorerConfig;
use crate::error::ScorerError;
use crate::features::FeatureVector;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Correlation-path output
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub is_anomaly: bool,
    /// Strength of the anomaly, in [0, 1]
    pub magnitude: f64,
}

/// Probability-path output
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityScore {
    pub malicious_probability: f64,
    pub confidence: f64,
}

impl ProbabilityScore {
    /// Clamp both values into [0, 1]; NaN becomes 0.
    pub fn new(malicious_probability: f64, confidence: f64) -> Self {
        Self {
            malicious_probability: unit(malicious_probability),
            confidence: unit(confidence),
        }
    }

    /// Confidence of a binary classifier: probability of the predicted class.
    pub fn from_probability(p: f64) -> Self {
        let p = unit(p);
        Self::new(p, p.max(1.0 - p))
    }
}

pub(crate) fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[async_trait]
pub trait AnomalyScorer: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn score(&self, features: &FeatureVector) -> Result<AnomalyScore, ScorerError>;

    async fn score_probability(&self, features: &FeatureVector) -> Result<ProbabilityScore, ScorerError>;
}

/// Stands in for a model that could not be reached. Every call fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableScorer {
    reason: String,
}

impl UnavailableScorer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl AnomalyScorer for UnavailableScorer {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn score(&self, _features: &FeatureVector) -> Result<AnomalyScore, ScorerError> {
        Err(ScorerError::Unavailable(self.reason.clone()))
    }

    async fn score_probability(&self, _features: &FeatureVector) -> Result<ProbabilityScore, ScorerError> {
        Err(ScorerError::Unavailable(self.reason.clone()))
    }
}

/// Run a scorer call under a time budget. Elapsed budget maps to [`ScorerError::Timeout`].
pub async fn call_with_timeout<T, F>(budget: Duration, call: F) -> Result<T, ScorerError>
where
    F: Future<Output = Result<T, ScorerError>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(ScorerError::Timeout(budget.as_millis() as u64)),
    }
}

/// Logistic model from `model_path` when it loads; heuristic scorer otherwise.
pub fn load_scorer(config: &ScorerConfig) -> Arc<dyn AnomalyScorer> {
    let path = &config.model_path;
    if !path.exists() {
        tracing::warn!(path = %path.display(), "model weights not found; using heuristic scorer");
        return Arc::new(HeuristicScorer::new(config.heuristic_threshold));
    }
    match LogisticScorer::load(path) {
        Ok(scorer) => {
            tracing::info!(path = %path.display(), "logistic scorer loaded");
            Arc::new(scorer)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "model weights rejected; using heuristic scorer");
            Arc::new(HeuristicScorer::new(config.heuristic_threshold))
        }
    }
}
