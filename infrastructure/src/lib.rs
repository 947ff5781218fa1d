//! Infrastructure layer for llm-council
//!
//! External adapters behind the application ports: configuration
//! loading, the OpenAI-compatible HTTP backend (feature `http-backend`),
//! offline mock backends, and the JSONL audit trail.

pub mod audit;
pub mod config;
pub mod providers;

pub use audit::{AuditStats, JsonlAuditSink};
pub use config::{ConfigLoader, FileConfig};
pub use providers::{MockEvaluation, MockGeneration, ScriptedEvaluation, ScriptedGeneration};

#[cfg(feature = "http-backend")]
pub use providers::{OpenAiCompatBackend, ProviderError};
