//! Evaluation aggregation
//!
//! Cross-judge helpers over the materialized evaluation list:
//! disagreement detection and retry-feedback aggregation. All functions
//! are commutative over judge order.

use crate::decision::entities::JudgeEvaluation;
use std::collections::BTreeMap;

/// Default spread (on a 0-10 scale) above which two judges are
/// considered to disagree.
pub const DEFAULT_DISAGREEMENT_THRESHOLD: f64 = 3.0;

/// Per-agent judge score spread
#[derive(Debug, Clone)]
pub struct DisagreementDetail {
    pub agent_id: String,
    /// Total score per judge id
    pub judge_totals: BTreeMap<String, f64>,
    /// `max(total) - min(total)` across judges
    pub spread: f64,
    /// Whether the spread strictly exceeds the threshold
    pub significant: bool,
}

/// Whether any agent with at least two judge totals has a spread
/// strictly exceeding `threshold`. A spread exactly at the threshold is
/// not a disagreement.
pub fn judges_disagree(evaluations: &[JudgeEvaluation], threshold: f64) -> bool {
    disagreement_details(evaluations, threshold)
        .iter()
        .any(|d| d.significant)
}

/// Spread details for every agent scored by at least two judges
pub fn disagreement_details(
    evaluations: &[JudgeEvaluation],
    threshold: f64,
) -> Vec<DisagreementDetail> {
    let mut by_agent: BTreeMap<&str, BTreeMap<String, f64>> = BTreeMap::new();
    for eval in evaluations {
        by_agent
            .entry(&eval.target_agent_id)
            .or_default()
            .insert(eval.judge_id.clone(), eval.total_score);
    }

    by_agent
        .into_iter()
        .filter(|(_, totals)| totals.len() >= 2)
        .map(|(agent_id, judge_totals)| {
            let max = judge_totals.values().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = judge_totals.values().copied().fold(f64::INFINITY, f64::min);
            let spread = max - min;
            DisagreementDetail {
                agent_id: agent_id.to_string(),
                judge_totals,
                spread,
                significant: spread > threshold,
            }
        })
        .collect()
}

/// Aggregate judge feedback for the selected response.
///
/// Per judge: flagged issues when present, otherwise the free-text
/// reasoning; empty when no judge targeted the agent or none had
/// anything to say. Feeds the single-shot retry decision.
pub fn judge_feedback_for(evaluations: &[JudgeEvaluation], agent_id: &str) -> String {
    let parts: Vec<String> = evaluations
        .iter()
        .filter(|e| e.target_agent_id == agent_id)
        .filter_map(|e| {
            if !e.flagged_issues.is_empty() {
                Some(format!("{} Judge: {}", e.judge_type, e.flagged_issues.join("; ")))
            } else if !e.reasoning.is_empty() {
                Some(format!("{} Judge: {}", e.judge_type, e.reasoning))
            } else {
                None
            }
        })
        .collect();

    parts.join(" | ")
}
