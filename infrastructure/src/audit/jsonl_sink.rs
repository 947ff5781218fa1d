//! JSONL audit trail
//!
//! Append-only decision trail: one JSON object per line, flushed after
//! every record for crash safety. Records arrive with the query already
//! hashed; raw query text never reaches this module.

use async_trait::async_trait;
use council_application::ports::audit::{AuditError, AuditOutcome, AuditRecord, AuditSink};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Audit sink writing one JSON line per decision.
///
/// Thread-safe via `Mutex<BufWriter<File>>`; the mutex also guarantees
/// that concurrent runs never interleave within a single record.
pub struct JsonlAuditSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Open (or create) the trail at the given path in append mode.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `count` most recent records, newest last.
    pub fn recent(&self, count: usize) -> Vec<AuditRecord> {
        let records = self.read_all();
        let skip = records.len().saturating_sub(count);
        records.into_iter().skip(skip).collect()
    }

    /// Look up one record by decision id.
    pub fn find(&self, decision_id: &str) -> Option<AuditRecord> {
        self.read_all()
            .into_iter()
            .find(|record| record.decision_id == decision_id)
    }

    /// Aggregate statistics over the whole trail.
    pub fn stats(&self) -> AuditStats {
        let records = self.read_all();
        let mut stats = AuditStats {
            total: records.len(),
            ..AuditStats::default()
        };

        let mut confidence_sum = 0.0;
        for record in &records {
            match &record.outcome {
                AuditOutcome::Blocked { .. } => stats.blocked += 1,
                AuditOutcome::Decision {
                    confidence,
                    risk_level,
                    ..
                } => {
                    stats.decided += 1;
                    confidence_sum += confidence;
                    *stats.by_risk.entry(risk_level.to_string()).or_insert(0) += 1;
                }
            }
        }
        if stats.decided > 0 {
            stats.average_confidence = Some(confidence_sum / stats.decided as f64);
        }
        stats
    }

    fn read_all(&self) -> Vec<AuditRecord> {
        // Make sure everything written so far is on disk before reading
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }

        let Ok(file) = File::open(&self.path) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(&line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable audit line");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<String, AuditError> {
        let line = serde_json::to_string(record)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AuditError::WriteFailed("audit writer poisoned".to_string()))?;
        writeln!(writer, "{line}").map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        Ok(record.decision_id.clone())
    }
}

impl Drop for JsonlAuditSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

/// Aggregates for the `stats` subcommand
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditStats {
    pub total: usize,
    pub decided: usize,
    pub blocked: usize,
    /// Decision count per risk level
    pub by_risk: BTreeMap<String, usize>,
    pub average_confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use council_application::hash_query;
    use council_domain::RiskLevel;

    fn decision_record(id: &str, confidence: f64, risk_level: RiskLevel) -> AuditRecord {
        AuditRecord {
            log_timestamp: Utc::now(),
            decision_id: id.to_string(),
            query_hash: hash_query("what should we do"),
            safety_passed: true,
            outcome: AuditOutcome::Decision {
                selected_agent: "Analytical".to_string(),
                confidence,
                risk_level,
                risks: vec![],
                citations: vec![],
                agent_scores: BTreeMap::new(),
                processing_time_ms: 120,
                was_refined: true,
                was_retried: false,
                judge_disagreement: false,
            },
        }
    }

    fn blocked_record(id: &str) -> AuditRecord {
        AuditRecord {
            log_timestamp: Utc::now(),
            decision_id: id.to_string(),
            query_hash: hash_query("something forbidden"),
            safety_passed: false,
            outcome: AuditOutcome::Blocked {
                block_reason: "Blocked keyword detected: 'forbidden'".to_string(),
                matched_patterns: vec!["forbidden".to_string()],
            },
        }
    }

    fn sink() -> (tempfile::TempDir, JsonlAuditSink) {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlAuditSink::new(dir.path().join("trail.jsonl")).unwrap();
        (dir, sink)
    }

    #[tokio::test]
    async fn test_records_roundtrip() {
        let (_dir, sink) = sink();
        sink.record(&decision_record("aaaa1111", 0.9, RiskLevel::Low))
            .await
            .unwrap();
        sink.record(&blocked_record("bbbb2222")).await.unwrap();

        let records = sink.recent(10);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].decision_id, "aaaa1111");
        assert!(!records[1].safety_passed);
    }

    #[tokio::test]
    async fn test_find_by_decision_id() {
        let (_dir, sink) = sink();
        sink.record(&decision_record("aaaa1111", 0.9, RiskLevel::Low))
            .await
            .unwrap();

        assert!(sink.find("aaaa1111").is_some());
        assert!(sink.find("missing1").is_none());
    }

    #[tokio::test]
    async fn test_stats_aggregation() {
        let (_dir, sink) = sink();
        sink.record(&decision_record("aaaa1111", 0.8, RiskLevel::Low))
            .await
            .unwrap();
        sink.record(&decision_record("cccc3333", 0.6, RiskLevel::Medium))
            .await
            .unwrap();
        sink.record(&blocked_record("bbbb2222")).await.unwrap();

        let stats = sink.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.decided, 2);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.by_risk["LOW"], 1);
        assert_eq!(stats.by_risk["MEDIUM"], 1);
        assert!((stats.average_confidence.unwrap() - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reopening_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trail.jsonl");

        let sink = JsonlAuditSink::new(&path).unwrap();
        sink.record(&decision_record("aaaa1111", 0.9, RiskLevel::Low))
            .await
            .unwrap();
        drop(sink);

        let sink = JsonlAuditSink::new(&path).unwrap();
        sink.record(&decision_record("cccc3333", 0.7, RiskLevel::Low))
            .await
            .unwrap();

        assert_eq!(sink.recent(10).len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trail.jsonl");
        std::fs::write(&path, "not json at all\n").unwrap();

        let sink = JsonlAuditSink::new(&path).unwrap();
        sink.record(&decision_record("aaaa1111", 0.9, RiskLevel::Low))
            .await
            .unwrap();

        assert_eq!(sink.recent(10).len(), 1);
    }
}
