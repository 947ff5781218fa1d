//! Domain layer for llm-council
//!
//! This crate contains the core decision-pipeline entities and the
//! synchronous logic that operates on them. It has no dependencies on
//! infrastructure or presentation concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A query is answered by several independently-configured generation
//! agents, scored by evaluation judges against weighted rubrics, reduced
//! to a single selected answer, and optionally refined using the other
//! agents' perspectives.
//!
//! ## Kill Switch (warn, don't block)
//!
//! Low confidence and judge disagreement produce visible advisory risk
//! flags and a risk-level promotion, but never withhold the final answer.

pub mod citations;
pub mod core;
pub mod decision;
pub mod evaluation;
pub mod risk;
pub mod roster;
pub mod rubric;
pub mod safety;
pub mod selection;
pub mod stage;

// Re-export commonly used types
pub use citations::extract_citations;
pub use core::error::DomainError;
pub use decision::{
    entities::{
        AgentResponse, BlockedDecision, Decision, GENERATION_ERROR_PREFIX, JudgeEvaluation,
        Verdict,
    },
    risk::RiskLevel,
};
pub use evaluation::{
    DisagreementDetail, disagreement_details, judge_feedback_for, judges_disagree,
};
pub use risk::assess_risk;
pub use roster::{AgentIdentity, JudgeIdentity};
pub use rubric::{Rubric, RubricDimension};
pub use safety::{
    gate::{SafetyGate, SafetyResult, SafetyRules},
    redact::redact,
};
pub use selection::{Selection, select};
pub use stage::StageEvent;
