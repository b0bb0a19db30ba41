//! honeyrisk — real-time risk scoring for honeypot and network events.
//!
//! Modular structure:
//! - [`events`] — Event model, wire shape and boundary validation
//! - [`features`] — Windowed per-source feature extraction (15 features)
//! - [`signatures`] — Deterministic service signature rules
//! - [`intel`] — Threat feed reputation lookup
//! - [`model`] — Pluggable anomaly scorer interface and bundled scorers
//! - [`risk`] — Risk correlation verdicts and enforcement decisions
//! - [`orchestrator`] — Correlation and probability scoring paths
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod error;
pub mod events;
pub mod features;
pub mod signatures;
pub mod intel;
pub mod model;
pub mod risk;
pub mod orchestrator;
pub mod logging;

pub use config::PipelineConfig;
pub use error::{ScorerError, ScoringError};
pub use events::{Event, Protocol, RawEvent, ServiceMetadata};
pub use features::{FeatureExtractor, FeatureVector};
pub use signatures::{Signature, SignatureEngine, SignatureMatch};
pub use intel::ThreatFeed;
pub use model::{AnomalyScore, AnomalyScorer, ProbabilityScore};
pub use risk::{Action, DecisionEngine, Prediction, RiskAssessment, RiskCorrelator, Verdict};
pub use orchestrator::{Evaluation, ScoreDecision, ScoreResult, ScoringOrchestrator, ThreatLevel};
pub use logging::StructuredLogger;
