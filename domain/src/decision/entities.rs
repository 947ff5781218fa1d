//! Decision entities - immutable artifacts of a single pipeline run.
//!
//! All of these types are created during one council run and never
//! mutated afterwards:
//! - [`AgentResponse`] - One agent's draft answer from the generation phase
//! - [`JudgeEvaluation`] - One judge's scoring of one draft
//! - [`Decision`] - Terminal artifact for an accepted query
//! - [`BlockedDecision`] - Terminal artifact when the safety gate rejects

use super::risk::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix marking a generation response that captured a backend failure.
///
/// A failed agent still yields exactly one [`AgentResponse`] so the batch
/// completes; downstream consumers detect the marker instead of an error.
pub const GENERATION_ERROR_PREFIX: &str = "[Error generating response:";

/// Response from a single agent in the generation phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Identifier of the agent that produced this draft
    pub agent_id: String,
    /// Display type (e.g. "Analytical", "Creative", "Pragmatist")
    pub agent_type: String,
    /// The draft answer text
    pub text: String,
    /// Generation temperature the agent was configured with
    pub temperature: f32,
    /// Wall-clock generation time in milliseconds
    pub generation_time_ms: u64,
}

impl AgentResponse {
    pub fn new(
        agent_id: impl Into<String>,
        agent_type: impl Into<String>,
        text: impl Into<String>,
        temperature: f32,
        generation_time_ms: u64,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            text: text.into(),
            temperature,
            generation_time_ms,
        }
    }

    /// Create a response capturing a backend failure.
    ///
    /// The error is embedded as marker text so the generation batch still
    /// produces one response per configured agent.
    pub fn failure(
        agent_id: impl Into<String>,
        agent_type: impl Into<String>,
        temperature: f32,
        error: impl std::fmt::Display,
        generation_time_ms: u64,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            text: format!("{GENERATION_ERROR_PREFIX} {error}]"),
            temperature,
            generation_time_ms,
        }
    }

    /// Whether this response captured a backend failure
    pub fn is_error(&self) -> bool {
        self.text.starts_with(GENERATION_ERROR_PREFIX)
    }

    /// Derive the refined variant of this response.
    ///
    /// The refined response carries id `<agent_id>_refined` and type
    /// `<agent_type> (Refined)` so it is distinguishable from the drafts.
    pub fn refined(&self, text: impl Into<String>, generation_time_ms: u64) -> Self {
        Self {
            agent_id: format!("{}_refined", self.agent_id),
            agent_type: format!("{} (Refined)", self.agent_type),
            text: text.into(),
            temperature: self.temperature,
            generation_time_ms,
        }
    }
}

/// Evaluation of one agent response by one judge
///
/// Judges never alter or generate response content - evaluation is
/// read-only with respect to [`AgentResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeEvaluation {
    /// Identifier of the judge
    pub judge_id: String,
    /// Judge type (e.g. "Factuality", "Safety")
    pub judge_type: String,
    /// The agent response this evaluation targets
    pub target_agent_id: String,
    /// Per-dimension scores on a 0-10 scale
    pub scores: BTreeMap<String, f64>,
    /// Weighted average of the dimension scores (0-10)
    pub total_score: f64,
    /// Free-text reasoning from the judge
    pub reasoning: String,
    /// Issues the judge flagged, in the order they were reported
    pub flagged_issues: Vec<String>,
}

/// Which artifact a pipeline run produced.
///
/// A run produces exactly one of the two - never both, never neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Verdict {
    Decided(Box<Decision>),
    Blocked(BlockedDecision),
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked(_))
    }

    pub fn decision_id(&self) -> &str {
        match self {
            Verdict::Decided(d) => &d.decision_id,
            Verdict::Blocked(b) => &b.decision_id,
        }
    }

    /// The answer text callers should present, if the query was accepted
    pub fn final_text(&self) -> Option<&str> {
        match self {
            Verdict::Decided(d) => Some(d.final_text()),
            Verdict::Blocked(_) => None,
        }
    }
}

/// Terminal artifact of a successful (non-blocked) council run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: String,
    pub timestamp: DateTime<Utc>,
    pub query: String,

    /// All generation drafts, in panel-declaration order
    pub agent_responses: Vec<AgentResponse>,
    /// One evaluation per (judge, response) pair
    pub judge_evaluations: Vec<JudgeEvaluation>,

    /// The winning draft
    pub selected_response: AgentResponse,
    /// Refined version of the winner, when synthesis ran.
    /// When present this is the answer; otherwise `selected_response` is.
    pub refined_response: Option<AgentResponse>,

    /// Winning agent's average judge score normalized to 0..1
    pub confidence: f64,
    pub risk_level: RiskLevel,
    /// Risk flags in the order they were identified
    pub identified_risks: Vec<String>,
    /// Citations extracted from the final answer text
    pub citations: Vec<String>,

    pub selection_rationale: String,
    /// Judge feedback that triggered the retry, if one fired
    pub retry_feedback: String,

    pub processing_time_ms: u64,
    pub safety_passed: bool,
    pub judge_disagreement: bool,
    pub was_refined: bool,
    pub was_retried: bool,
}

impl Decision {
    /// Average score per agent across all judges that scored it
    pub fn agent_scores(&self) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for eval in &self.judge_evaluations {
            let entry = totals.entry(eval.target_agent_id.clone()).or_insert((0.0, 0));
            entry.0 += eval.total_score;
            entry.1 += 1;
        }
        totals
            .into_iter()
            .map(|(agent_id, (sum, count))| (agent_id, sum / count as f64))
            .collect()
    }

    /// Margin between the winner and the runner-up average score.
    ///
    /// Zero when fewer than two agents were scored.
    pub fn winner_margin(&self) -> f64 {
        let scores = self.agent_scores();
        if scores.len() < 2 {
            return 0.0;
        }
        let mut values: Vec<f64> = scores.values().copied().collect();
        values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        values[0] - values[1]
    }

    /// The answer text: refined if synthesis ran, otherwise the selection
    pub fn final_text(&self) -> &str {
        match &self.refined_response {
            Some(refined) => &refined.text,
            None => &self.selected_response.text,
        }
    }

    /// Human-readable summary of the run
    pub fn summary(&self) -> String {
        let refinement_note = if self.was_refined { " (REFINED)" } else { "" };
        let retry_note = if self.was_retried { " (RETRIED)" } else { "" };

        let scores = self
            .agent_scores()
            .into_iter()
            .map(|(id, score)| format!("- {id}: {score:.1}/10"))
            .collect::<Vec<_>>()
            .join("\n");

        let risks = if self.identified_risks.is_empty() {
            "- None".to_string()
        } else {
            self.identified_risks
                .iter()
                .map(|r| format!("- {r}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "Decision ID: {}\n\
             Selected Agent: {}{}{}\n\
             Confidence: {:.0}%\n\
             Risk Level: {}\n\
             Processing Time: {}ms\n\
             Judge Disagreement: {}\n\n\
             Agent Scores:\n{}\n\n\
             Identified Risks:\n{}",
            self.decision_id,
            self.selected_response.agent_type,
            refinement_note,
            retry_note,
            self.confidence * 100.0,
            self.risk_level,
            self.processing_time_ms,
            if self.judge_disagreement { "Yes" } else { "No" },
            scores,
            risks,
        )
    }
}

/// Terminal artifact when the safety gate rejects the query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedDecision {
    pub decision_id: String,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub block_reason: String,
    pub matched_patterns: Vec<String>,
}
