//! Safety gate and redaction
//!
//! Pre-filters queries before any backend call is made, and scrubs PII
//! from text bound for persistence or display.

pub mod gate;
pub mod redact;

pub use gate::{SafetyGate, SafetyResult, SafetyRules};
pub use redact::redact;
