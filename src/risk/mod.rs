//! Risk correlation (verdicts) and enforcement decisions.

mod correlator;
mod decision;

pub use correlator::{RiskAssessment, RiskCorrelator, RiskDetails, Verdict};
pub use decision::{Action, DecisionEngine, Prediction, ResponseProfile};

pub(crate) use correlator::round2;
