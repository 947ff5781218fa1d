//! Decision artifacts
//!
//! The terminal outputs of a pipeline run: [`Decision`] for accepted
//! queries, [`BlockedDecision`] for queries rejected by the safety gate.

pub mod entities;
pub mod risk;

pub use entities::{AgentResponse, BlockedDecision, Decision, JudgeEvaluation, Verdict};
pub use risk::RiskLevel;
