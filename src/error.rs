use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of an anomaly scorer call. The pipeline degrades on every variant.
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("scorer unavailable: {0}")]
    Unavailable(String),

    #[error("scorer timed out after {0} ms")]
    Timeout(u64),

    #[error("model error: {0}")]
    Model(String),

    #[error("feature dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, ScoringError>;
