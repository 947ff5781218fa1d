//! Winner selection
//!
//! Reduces per-agent judge scores to a single winner with a deterministic
//! tie-break and a scalar confidence. Pure computation over materialized
//! data - no suspension points.

use crate::decision::entities::{AgentResponse, JudgeEvaluation};

/// Result of winner selection
#[derive(Debug, Clone)]
pub struct Selection {
    /// Index of the winning response in panel-declaration order
    pub winner_index: usize,
    /// Winning agent's average judge score normalized to 0..1
    pub confidence: f64,
    /// Human-readable rationale listing every agent's average score
    pub rationale: String,
}

/// Select the winning response from the judge evaluations.
///
/// Each agent's average `total_score` across all judges that scored it is
/// computed; the highest average wins. Exact floating-point ties are
/// broken in favor of an agent whose id or type carries a safety-advocate
/// marker, otherwise the first tied agent in panel-declaration order.
/// With no evaluations at all, falls back to the first response with
/// confidence 0.
///
/// The evaluation list may arrive in any order; the result depends only
/// on its contents.
pub fn select(responses: &[AgentResponse], evaluations: &[JudgeEvaluation]) -> Selection {
    assert!(!responses.is_empty(), "selection requires at least one response");

    // Average score per agent, slotted in declaration order
    let averages: Vec<Option<f64>> = responses
        .iter()
        .map(|response| {
            let totals: Vec<f64> = evaluations
                .iter()
                .filter(|e| e.target_agent_id == response.agent_id)
                .map(|e| e.total_score)
                .collect();
            if totals.is_empty() {
                None
            } else {
                Some(totals.iter().sum::<f64>() / totals.len() as f64)
            }
        })
        .collect();

    let best = averages
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    if best == f64::NEG_INFINITY {
        return Selection {
            winner_index: 0,
            confidence: 0.0,
            rationale: "No evaluations available; falling back to the first response".to_string(),
        };
    }

    // Exact ties, in declaration order
    let tied: Vec<usize> = averages
        .iter()
        .enumerate()
        .filter_map(|(i, avg)| (*avg == Some(best)).then_some(i))
        .collect();

    let winner_index = tied
        .iter()
        .copied()
        .find(|&i| is_safety_advocate(&responses[i]))
        .unwrap_or(tied[0]);

    let confidence = best / 10.0;
    let rationale = build_rationale(responses, evaluations, &averages, winner_index);

    Selection {
        winner_index,
        confidence,
        rationale,
    }
}

/// Tie-break marker check.
///
/// The default roster carries no safety-named generation agent, so this
/// branch only fires for rosters that configure one.
fn is_safety_advocate(response: &AgentResponse) -> bool {
    let id = response.agent_id.to_lowercase();
    let agent_type = response.agent_type.to_lowercase();
    id.contains("safety")
        || id.contains("advocate")
        || agent_type.contains("safety")
        || agent_type.contains("advocate")
}

fn build_rationale(
    responses: &[AgentResponse],
    evaluations: &[JudgeEvaluation],
    averages: &[Option<f64>],
    winner_index: usize,
) -> String {
    let mut scored: Vec<(&str, f64)> = responses
        .iter()
        .zip(averages)
        .filter_map(|(r, avg)| avg.map(|a| (r.agent_id.as_str(), a)))
        .collect();
    // Stable sort: equal scores keep declaration order
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let scores_str = scored
        .iter()
        .map(|(id, avg)| format!("{id}: {avg:.1}"))
        .collect::<Vec<_>>()
        .join(", ");

    let winner = &responses[winner_index];
    let issues: Vec<&str> = evaluations
        .iter()
        .filter(|e| e.target_agent_id == winner.agent_id)
        .flat_map(|e| e.flagged_issues.iter().map(String::as_str))
        .collect();

    let issues_str = if issues.is_empty() {
        String::new()
    } else {
        format!(" Issues: {issues:?}")
    };

    format!(
        "Selected {} with highest average score. Scores: {}.{}",
        winner.agent_type, scores_str, issues_str
    )
}
