//! Audit sink port
//!
//! Defines the interface for the durable decision trail. Privacy
//! contract: the sink never receives the raw query text, only a
//! one-way, fixed-length, deterministic hash of it, so the same query
//! always produces the same hash for dedup and analytics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use council_domain::{RiskLevel, Verdict, redact};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// Deterministic one-way hash of a query (SHA-256 hex, 16 chars)
pub fn hash_query(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

/// Errors from the audit trail
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit write failed: {0}")]
    WriteFailed(String),

    #[error("Audit serialization failed: {0}")]
    Serialization(String),
}

/// Outcome-specific fields of an audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditOutcome {
    Decision {
        selected_agent: String,
        confidence: f64,
        risk_level: RiskLevel,
        risks: Vec<String>,
        citations: Vec<String>,
        agent_scores: BTreeMap<String, f64>,
        processing_time_ms: u64,
        was_refined: bool,
        was_retried: bool,
        judge_disagreement: bool,
    },
    Blocked {
        block_reason: String,
        matched_patterns: Vec<String>,
    },
}

/// One entry of the append-only audit trail.
///
/// Built from a [`Verdict`] with the query replaced by its hash; the raw
/// query never reaches the sink. Risk and citation text is PII-redacted
/// before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub log_timestamp: DateTime<Utc>,
    pub decision_id: String,
    pub query_hash: String,
    pub safety_passed: bool,
    #[serde(flatten)]
    pub outcome: AuditOutcome,
}

impl AuditRecord {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        match verdict {
            Verdict::Decided(decision) => Self {
                log_timestamp: Utc::now(),
                decision_id: decision.decision_id.clone(),
                query_hash: hash_query(&decision.query),
                safety_passed: true,
                outcome: AuditOutcome::Decision {
                    selected_agent: decision.selected_response.agent_type.clone(),
                    confidence: decision.confidence,
                    risk_level: decision.risk_level,
                    risks: decision
                        .identified_risks
                        .iter()
                        .map(|r| redact(r))
                        .collect(),
                    citations: decision.citations.iter().map(|c| redact(c)).collect(),
                    agent_scores: decision.agent_scores(),
                    processing_time_ms: decision.processing_time_ms,
                    was_refined: decision.was_refined,
                    was_retried: decision.was_retried,
                    judge_disagreement: decision.judge_disagreement,
                },
            },
            Verdict::Blocked(blocked) => Self {
                log_timestamp: Utc::now(),
                decision_id: blocked.decision_id.clone(),
                query_hash: hash_query(&blocked.query),
                safety_passed: false,
                outcome: AuditOutcome::Blocked {
                    block_reason: blocked.block_reason.clone(),
                    matched_patterns: blocked.matched_patterns.clone(),
                },
            },
        }
    }
}

/// Sink for the append-only decision trail.
///
/// Must support concurrent appends from multiple runs without
/// interleaving within a single record.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record a decision, returning the recorded id
    async fn record(&self, record: &AuditRecord) -> Result<String, AuditError>;
}

/// No-op sink for tests and when auditing is disabled
pub struct NoAuditSink;

#[async_trait]
impl AuditSink for NoAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<String, AuditError> {
        Ok(record.decision_id.clone())
    }
}
