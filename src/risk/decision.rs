//! Deterministic decision table: classifier signals → enforcement action.

use crate::config::DecisionThresholds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Benign,
    Malicious,
}

impl From<bool> for Prediction {
    fn from(malicious: bool) -> Self {
        if malicious {
            Prediction::Malicious
        } else {
            Prediction::Benign
        }
    }
}

impl TryFrom<u8> for Prediction {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Prediction::Benign),
            1 => Ok(Prediction::Malicious),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Log,
    Throttle,
    Deceive,
    Block,
}

/// What an enforcement collaborator should do for an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseProfile {
    pub action: &'static str,
    pub description: &'static str,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_rate: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_rule: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

const NONE: ResponseProfile = ResponseProfile {
    action: "",
    description: "",
    priority: 0,
    limit_rate: None,
    burst: None,
    target: None,
    firewall_rule: None,
    duration_secs: None,
};

impl Action {
    pub fn response(self) -> ResponseProfile {
        match self {
            Action::Log => ResponseProfile {
                action: "log",
                description: "Log event only",
                ..NONE
            },
            Action::Throttle => ResponseProfile {
                action: "rate_limit",
                description: "Degrade connection quality",
                priority: 1,
                limit_rate: Some("10/m"),
                burst: Some(5),
                ..NONE
            },
            Action::Deceive => ResponseProfile {
                action: "redirect",
                description: "Route to high-interaction honeypot",
                priority: 2,
                target: Some("honeypot_cluster_1"),
                ..NONE
            },
            Action::Block => ResponseProfile {
                action: "drop",
                description: "Sever connection immediately",
                priority: 3,
                firewall_rule: Some("DROP_IMMEDIATE"),
                duration_secs: Some(3600),
                ..NONE
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    thresholds: DecisionThresholds,
}

impl DecisionEngine {
    pub fn new(thresholds: DecisionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &DecisionThresholds {
        &self.thresholds
    }

    /// Rules in order: benign → LOG; low confidence → THROTTLE; all-high → BLOCK;
    /// medium confidence and anomaly → DECEIVE; otherwise THROTTLE.
    pub fn decide(
        &self,
        prediction: Prediction,
        confidence: f64,
        anomaly_score: f64,
        threat_score: f64,
    ) -> Action {
        let t = &self.thresholds;
        if prediction == Prediction::Benign {
            return Action::Log;
        }
        if confidence < t.medium_confidence {
            return Action::Throttle;
        }
        if confidence >= t.high_confidence && anomaly_score >= t.high && threat_score >= t.high {
            return Action::Block;
        }
        if confidence >= t.medium_confidence && anomaly_score >= t.medium {
            return Action::Deceive;
        }
        Action::Throttle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_table() {
        let engine = DecisionEngine::default();
        let cases = [
            (0u8, 0.1, 0.9, 0.9, Action::Log),
            (0, 1.0, 1.0, 1.0, Action::Log),
            (1, 0.5, 0.1, 0.1, Action::Throttle),
            (1, 0.59, 1.0, 1.0, Action::Throttle),
            (1, 0.9, 0.9, 0.9, Action::Block),
            (1, 0.8, 0.8, 0.8, Action::Block),
            (1, 0.7, 0.6, 0.0, Action::Deceive),
            (1, 0.6, 0.5, 0.0, Action::Deceive),
            (1, 0.9, 0.9, 0.79, Action::Deceive),
            (1, 0.9, 0.1, 0.9, Action::Throttle),
            (1, 0.6, 0.49, 1.0, Action::Throttle),
        ];
        for (pred, conf, anomaly, threat, expected) in cases {
            let p = Prediction::try_from(pred).unwrap();
            assert_eq!(
                engine.decide(p, conf, anomaly, threat),
                expected,
                "({}, {}, {}, {})",
                pred,
                conf,
                anomaly,
                threat
            );
        }
    }

    #[test]
    fn total_over_grid() {
        let engine = DecisionEngine::default();
        let steps: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        for p in [Prediction::Benign, Prediction::Malicious] {
            for &c in &steps {
                for &a in &steps {
                    for &t in &steps {
                        let action = engine.decide(p, c, a, t);
                        let again = engine.decide(p, c, a, t);
                        assert_eq!(action, again);
                        if p == Prediction::Benign {
                            assert_eq!(action, Action::Log);
                        }
                        if action == Action::Block {
                            assert!(c >= 0.8 && a >= 0.8 && t >= 0.8);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn custom_thresholds() {
        let engine = DecisionEngine::new(DecisionThresholds {
            high: 0.95,
            ..DecisionThresholds::default()
        });
        assert_eq!(engine.decide(Prediction::Malicious, 0.9, 0.9, 0.9), Action::Deceive);
    }

    #[test]
    fn prediction_domain() {
        assert_eq!(Prediction::try_from(2u8), Err(2));
        assert_eq!(Prediction::from(true), Prediction::Malicious);
    }

    #[test]
    fn response_profiles() {
        assert_eq!(Action::Log.response().priority, 0);
        assert_eq!(Action::Throttle.response().limit_rate, Some("10/m"));
        assert_eq!(Action::Deceive.response().target, Some("honeypot_cluster_1"));
        let block = Action::Block.response();
        assert_eq!(block.duration_secs, Some(3600));
        assert_eq!(block.firewall_rule, Some("DROP_IMMEDIATE"));
        assert!(Action::Block.response().priority > Action::Deceive.response().priority);
    }
}
