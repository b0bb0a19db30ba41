//! Logistic-regression scorer. Input: the 15-feature vector, standardized; output: sigmoid
//! probability. Weights come from a JSON file exported by the training side.

use super::{AnomalyScore, AnomalyScorer, ProbabilityScore};
use crate::error::ScorerError;
use crate::features::{FeatureVector, FEATURE_COUNT};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
struct Weights {
    weights: Vec<f64>,
    bias: f64,
    #[serde(default)]
    means: Option<Vec<f64>>,
    #[serde(default)]
    scales: Option<Vec<f64>>,
    #[serde(default = "default_threshold")]
    anomaly_threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone)]
pub struct LogisticScorer {
    weights: [f64; FEATURE_COUNT],
    bias: f64,
    means: [f64; FEATURE_COUNT],
    scales: [f64; FEATURE_COUNT],
    anomaly_threshold: f64,
}

fn fixed(name: &str, v: Vec<f64>) -> Result<[f64; FEATURE_COUNT], ScorerError> {
    let got = v.len();
    <[f64; FEATURE_COUNT]>::try_from(v).map_err(|_| {
        tracing::debug!(field = name, got, "wrong model vector length");
        ScorerError::Dimension {
            expected: FEATURE_COUNT,
            got,
        }
    })
}

impl LogisticScorer {
    pub fn new(weights: [f64; FEATURE_COUNT], bias: f64) -> Self {
        Self {
            weights,
            bias,
            means: [0.0; FEATURE_COUNT],
            scales: [1.0; FEATURE_COUNT],
            anomaly_threshold: default_threshold(),
        }
    }

    /// Load weights JSON: `{"weights": [..15], "bias": b, "means"?: [..15], "scales"?: [..15]}`.
    pub fn load(path: &Path) -> Result<Self, ScorerError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| ScorerError::Model(format!("{}: {}", path.display(), e)))?;
        let w: Weights = serde_json::from_str(&data).map_err(|e| ScorerError::Model(e.to_string()))?;

        let mut scorer = Self::new(fixed("weights", w.weights)?, w.bias);
        if let Some(m) = w.means {
            scorer.means = fixed("means", m)?;
        }
        if let Some(s) = w.scales {
            scorer.scales = fixed("scales", s)?;
        }
        if !(0.0..=1.0).contains(&w.anomaly_threshold) {
            return Err(ScorerError::Model("anomaly_threshold must be in [0, 1]".into()));
        }
        scorer.anomaly_threshold = w.anomaly_threshold;
        Ok(scorer)
    }

    /// Malicious probability in [0, 1]
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let x = features.to_array();
        let z = x
            .iter()
            .zip(&self.weights)
            .zip(self.means.iter().zip(&self.scales))
            .map(|((v, w), (m, s))| {
                let s = if *s == 0.0 { 1.0 } else { *s };
                w * (v - m) / s
            })
            .sum::<f64>()
            + self.bias;
        super::unit(1.0 / (1.0 + (-z).exp()))
    }
}

#[async_trait]
impl AnomalyScorer for LogisticScorer {
    fn name(&self) -> &str {
        "logistic"
    }

    async fn score(&self, features: &FeatureVector) -> Result<AnomalyScore, ScorerError> {
        let p = self.predict(features);
        Ok(AnomalyScore {
            is_anomaly: p >= self.anomaly_threshold,
            magnitude: p,
        })
    }

    async fn score_probability(&self, features: &FeatureVector) -> Result<ProbabilityScore, ScorerError> {
        Ok(ProbabilityScore::from_probability(self.predict(features)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn zero_weights_give_half() {
        let s = LogisticScorer::new([0.0; FEATURE_COUNT], 0.0);
        assert_eq!(s.predict(&FeatureVector::default()), 0.5);
    }

    #[tokio::test]
    async fn burst_weight_drives_probability() {
        let mut w = [0.0; FEATURE_COUNT];
        w[8] = 1.0; // burst_rate
        let s = LogisticScorer::new(w, -5.0);
        let calm = FeatureVector { burst_rate: 1.0, ..Default::default() };
        let storm = FeatureVector { burst_rate: 20.0, ..Default::default() };
        assert!(s.predict(&calm) < 0.05);
        assert!(s.predict(&storm) > 0.99);
        let a = s.score(&storm).await.unwrap();
        assert!(a.is_anomaly);
        assert!(!s.score(&calm).await.unwrap().is_anomaly);
    }

    #[test]
    fn load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let weights = vec![0.0; FEATURE_COUNT];
        write!(f, "{}", serde_json::json!({ "weights": weights, "bias": 2.0 })).unwrap();
        let s = LogisticScorer::load(f.path()).unwrap();
        assert!(s.predict(&FeatureVector::default()) > 0.88);
    }

    #[test]
    fn wrong_dimension_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"weights": [1.0, 2.0], "bias": 0.0}}"#).unwrap();
        assert!(matches!(
            LogisticScorer::load(f.path()),
            Err(ScorerError::Dimension { expected: 15, got: 2 })
        ));
    }
}
