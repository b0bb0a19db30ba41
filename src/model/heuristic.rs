//! Rule-only scorer used when no trained model is available.

use super::{AnomalyScore, AnomalyScorer, ProbabilityScore};
use crate::error::ScorerError;
use crate::features::FeatureVector;
use async_trait::async_trait;

const FLAGGED_PROBABILITY: f64 = 0.7;
const CLEAN_PROBABILITY: f64 = 0.2;
const MAX_SIGNAL: f64 = 4.25;

/// Sums a few normalized indicators; above `threshold` the event is treated as anomalous.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    threshold: f64,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl HeuristicScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn signal(&self, f: &FeatureVector) -> f64 {
        f.malicious_flag_ratio
            + f.time_of_day_deviation * 0.25
            + (f.burst_rate / 20.0).min(1.0)
            + (f.z_score_anomaly.abs() / 3.0).min(1.0)
            + (f.threat_score / 100.0).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl AnomalyScorer for HeuristicScorer {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn score(&self, features: &FeatureVector) -> Result<AnomalyScore, ScorerError> {
        let signal = self.signal(features);
        Ok(AnomalyScore {
            is_anomaly: signal > self.threshold,
            magnitude: (signal / MAX_SIGNAL).min(1.0),
        })
    }

    async fn score_probability(&self, features: &FeatureVector) -> Result<ProbabilityScore, ScorerError> {
        let p = if self.signal(features) > self.threshold {
            FLAGGED_PROBABILITY
        } else {
            CLEAN_PROBABILITY
        };
        Ok(ProbabilityScore::from_probability(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quiet_source_is_clean() {
        let s = HeuristicScorer::default();
        let fv = FeatureVector { packet_length: 1500.0, burst_rate: 1.0, ..Default::default() };
        let a = s.score(&fv).await.unwrap();
        assert!(!a.is_anomaly);
        let p = s.score_probability(&fv).await.unwrap();
        assert_eq!(p.malicious_probability, 0.2);
        assert_eq!(p.confidence, 0.8);
    }

    #[tokio::test]
    async fn flagged_bursting_source_is_anomalous() {
        let s = HeuristicScorer::default();
        let fv = FeatureVector {
            malicious_flag_ratio: 1.0,
            burst_rate: 40.0,
            ..Default::default()
        };
        let a = s.score(&fv).await.unwrap();
        assert!(a.is_anomaly);
        assert!((a.magnitude - 2.0 / 4.25).abs() < 1e-12);
        assert_eq!(s.score_probability(&fv).await.unwrap().malicious_probability, 0.7);
    }
}
