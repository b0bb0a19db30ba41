//! Pipeline configuration. Every section has defaults so a missing file still runs.

use crate::error::{Result, ScoringError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Windowed feature extraction and per-source state bounds
    pub features: FeaturesConfig,
    /// Anomaly scorer selection and call budget
    pub scorer: ScorerConfig,
    /// Decision engine thresholds
    pub decision: DecisionThresholds,
    /// Threat feed source
    pub feed: FeedConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Trailing window for `source_ip_event_rate` (seconds)
    pub rate_window_secs: u64,
    /// Trailing window for `burst_rate` (seconds)
    pub burst_window_secs: u64,
    /// Max window timestamps and packet-length / malicious-flag samples kept per source
    pub max_history: usize,
    /// Max distinct destinations / honeypot services tracked per source
    pub max_distinct: usize,
    /// Sources untouched for this long are evicted
    pub idle_ttl_secs: u64,
    /// Interval of the background eviction sweep
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Logistic model weights (JSON). Missing file falls back to the heuristic scorer.
    pub model_path: PathBuf,
    /// Upper bound for a single scorer call
    pub timeout_ms: u64,
    /// Signal level above which the heuristic scorer flags an anomaly
    pub heuristic_threshold: f64,
}

/// Decision engine thresholds, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    pub low: f64,
    pub medium_confidence: f64,
    pub medium: f64,
    pub high_confidence: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// JSON object file mapping source address to category label
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            rate_window_secs: 60,
            burst_window_secs: 10,
            max_history: 1000,
            max_distinct: 4096,
            idle_ttl_secs: 600,
            sweep_interval_secs: 60,
        }
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.json"),
            timeout_ms: 250,
            heuristic_threshold: 1.0,
        }
    }
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium_confidence: 0.6,
            medium: 0.5,
            high_confidence: 0.8,
            high: 0.8,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl PipelineConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(c) => c,
            Err(e) => {
                if path.exists() {
                    tracing::warn!(path = %path.display(), error = %e, "config unreadable; using defaults");
                }
                Self::default()
            }
        }
    }

    /// Strict variant of [`PipelineConfig::load`] that reports why a file was rejected.
    pub fn try_load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let f = &self.features;
        if f.rate_window_secs == 0 || f.burst_window_secs == 0 {
            return Err(ScoringError::Config("feature windows must be non-zero".into()));
        }
        if f.max_history == 0 {
            return Err(ScoringError::Config("max_history must be non-zero".into()));
        }
        if f.idle_ttl_secs == 0 {
            return Err(ScoringError::Config(
                "idle_ttl_secs must be non-zero; 0 would evict every source on each sweep".into(),
            ));
        }
        let d = &self.decision;
        for (name, v) in [
            ("low", d.low),
            ("medium_confidence", d.medium_confidence),
            ("medium", d.medium),
            ("high_confidence", d.high_confidence),
            ("high", d.high),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ScoringError::Config(format!("decision.{} must be in [0, 1]", name)));
            }
        }
        Ok(())
    }
}
