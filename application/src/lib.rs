//! Application layer for llm-council
//!
//! This crate contains the port definitions (backends, audit sink,
//! progress), the immutable council configuration, and the decision
//! pipeline orchestrator. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ConfigError, CouncilConfig};
pub use ports::{
    audit::{AuditOutcome, AuditRecord, AuditSink, NoAuditSink, hash_query},
    evaluation::{EvaluationBackend, StructuredEvaluation},
    generation::{BackendError, GenerationBackend, StreamEvent, StreamHandle},
    progress::{CouncilPhase, NoProgress, ProgressNotifier},
};
pub use use_cases::decide::{DecideError, DecideInput, RunCouncilUseCase};
