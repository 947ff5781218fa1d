//! Risk assessment
//!
//! Derives a risk classification and human-readable risk flags from the
//! judge output, confidence, and inter-judge disagreement. Advisory
//! warnings (low confidence, judges disagree) are appended by the
//! orchestrator afterwards, not here.

use crate::decision::entities::JudgeEvaluation;
use crate::decision::risk::RiskLevel;

/// Marker terms that force a CRITICAL classification when they appear in
/// any risk string.
const CRITICAL_MARKERS: [&str; 2] = ["harmful", "dangerous"];

/// Classify risk from the materialized evaluations.
///
/// Risk strings accumulate in order: low safety-dimension scores first,
/// then flagged issues deduplicated by exact string. Classification:
/// CRITICAL on a harm/danger marker, HIGH on 4+ risks or confidence
/// below 0.4, MEDIUM on 2+ risks, confidence below 0.6 or judge
/// disagreement, otherwise LOW.
pub fn assess_risk(
    evaluations: &[JudgeEvaluation],
    confidence: f64,
    judge_disagreement: bool,
) -> (RiskLevel, Vec<String>) {
    let mut risks: Vec<String> = Vec::new();

    // Low scores on any safety-judge dimension
    for eval in evaluations {
        if !eval.judge_type.eq_ignore_ascii_case("safety") {
            continue;
        }
        for (dimension, score) in &eval.scores {
            if *score < 5.0 {
                risks.push(format!("Low {dimension} score: {score}"));
            }
        }
    }

    // Flagged issues across all judges, deduplicated by exact string
    for eval in evaluations {
        for issue in &eval.flagged_issues {
            if !risks.contains(issue) {
                risks.push(issue.clone());
            }
        }
    }

    let level = if risks.iter().any(contains_critical_marker) {
        RiskLevel::Critical
    } else if risks.len() >= 4 || confidence < 0.4 {
        RiskLevel::High
    } else if risks.len() >= 2 || confidence < 0.6 || judge_disagreement {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    (level, risks)
}

fn contains_critical_marker(risk: &String) -> bool {
    let lower = risk.to_lowercase();
    CRITICAL_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn safety_eval(scores: &[(&str, f64)], issues: &[&str]) -> JudgeEvaluation {
        JudgeEvaluation {
            judge_id: "judge_safety".to_string(),
            judge_type: "Safety".to_string(),
            target_agent_id: "a1".to_string(),
            scores: scores
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
            total_score: 5.0,
            reasoning: String::new(),
            flagged_issues: issues.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_clean_run_is_low() {
        let (level, risks) = assess_risk(&[], 0.9, false);
        assert_eq!(level, RiskLevel::Low);
        assert!(risks.is_empty());
    }

    #[test]
    fn test_low_safety_dimension_becomes_risk() {
        let evals = vec![safety_eval(&[("harm_avoidance", 3.0)], &[])];
        let (_, risks) = assess_risk(&evals, 0.9, false);
        assert_eq!(risks, vec!["Low harm_avoidance score: 3"]);
    }

    #[test]
    fn test_non_safety_judge_dimensions_ignored() {
        let mut eval = safety_eval(&[("accuracy", 2.0)], &[]);
        eval.judge_type = "Factuality".to_string();
        let (level, risks) = assess_risk(&[eval], 0.9, false);
        assert_eq!(level, RiskLevel::Low);
        assert!(risks.is_empty());
    }

    #[test]
    fn test_flagged_issues_deduplicated() {
        let evals = vec![
            safety_eval(&[], &["weak sourcing"]),
            safety_eval(&[], &["weak sourcing", "overconfident"]),
        ];
        let (_, risks) = assess_risk(&evals, 0.9, false);
        assert_eq!(risks, vec!["weak sourcing", "overconfident"]);
    }

    #[test]
    fn test_harm_marker_forces_critical() {
        let evals = vec![safety_eval(&[], &["potentially harmful advice"])];
        let (level, _) = assess_risk(&evals, 0.95, false);
        assert_eq!(level, RiskLevel::Critical);
    }

    #[test]
    fn test_four_risks_is_high() {
        let evals = vec![safety_eval(&[], &["r1", "r2", "r3", "r4"])];
        let (level, risks) = assess_risk(&evals, 0.9, false);
        assert_eq!(risks.len(), 4);
        assert_eq!(level, RiskLevel::High);
    }

    #[test]
    fn test_low_confidence_is_high() {
        let (level, _) = assess_risk(&[], 0.39, false);
        assert_eq!(level, RiskLevel::High);
    }

    #[test]
    fn test_two_risks_is_medium() {
        let evals = vec![safety_eval(&[], &["r1", "r2"])];
        let (level, _) = assess_risk(&evals, 0.9, false);
        assert_eq!(level, RiskLevel::Medium);
    }

    #[test]
    fn test_moderate_confidence_is_medium() {
        let (level, _) = assess_risk(&[], 0.5, false);
        assert_eq!(level, RiskLevel::Medium);
    }

    #[test]
    fn test_disagreement_alone_is_medium() {
        let (level, _) = assess_risk(&[], 0.9, true);
        assert_eq!(level, RiskLevel::Medium);
    }
}
