//! Audit trail adapters

pub mod jsonl_sink;

pub use jsonl_sink::{AuditStats, JsonlAuditSink};
