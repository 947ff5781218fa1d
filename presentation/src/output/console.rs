//! Console output formatter for council decisions

use colored::{ColoredString, Colorize};
use council_domain::{BlockedDecision, Decision, RiskLevel, Verdict};

/// Formats council verdicts for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a verdict in the requested detail level
    pub fn format_verdict(verdict: &Verdict, full: bool) -> String {
        match verdict {
            Verdict::Decided(decision) => {
                if full {
                    Self::format(decision)
                } else {
                    Self::format_answer_only(decision)
                }
            }
            Verdict::Blocked(blocked) => Self::format_blocked(blocked),
        }
    }

    /// Format the complete decision with drafts, scores, and risks
    pub fn format(decision: &Decision) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("LLM Council Decision"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Question:".cyan().bold(),
            decision.query
        ));
        output.push_str(&format!(
            "{} {}\n\n",
            "Decision ID:".cyan().bold(),
            decision.decision_id
        ));

        // Phase 1: Agent Drafts
        output.push_str(&Self::section_header("Phase 1: Agent Drafts"));
        for response in &decision.agent_responses {
            if response.is_error() {
                output.push_str(&format!(
                    "\n{}\n{}\n",
                    format!("── {} ──", response.agent_type).red().bold(),
                    response.text
                ));
            } else {
                output.push_str(&format!(
                    "\n{}\n{}\n",
                    format!(
                        "── {} ({}ms) ──",
                        response.agent_type, response.generation_time_ms
                    )
                    .yellow()
                    .bold(),
                    response.text
                ));
            }
        }

        // Phase 2: Judge Scores
        output.push_str(&Self::section_header("Phase 2: Judge Scores"));
        for (agent_id, score) in decision.agent_scores() {
            let marker = if agent_id == decision.selected_response.agent_id {
                "*".green().bold().to_string()
            } else {
                " ".to_string()
            };
            output.push_str(&format!("{} {}: {:.1}/10\n", marker, agent_id, score));
        }
        if decision.judge_disagreement {
            output.push_str(&format!(
                "\n{}\n",
                "Judges disagreed significantly on this query.".yellow()
            ));
        }
        output.push_str(&format!("\n{}\n", decision.selection_rationale.dimmed()));

        // Phase 3: Final Answer
        output.push_str(&Self::section_header("Phase 3: Final Answer"));
        let mut notes = Vec::new();
        if decision.was_refined {
            notes.push("refined");
        }
        if decision.was_retried {
            notes.push("retried");
        }
        let note = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        output.push_str(&format!(
            "\n{}\n\n{}\n",
            format!("Selected: {}{}", decision.selected_response.agent_type, note)
                .yellow()
                .bold(),
            decision.final_text()
        ));

        // Assessment
        output.push_str(&Self::section_header("Assessment"));
        output.push_str(&format!(
            "{} {:.0}%\n",
            "Confidence:".cyan().bold(),
            decision.confidence * 100.0
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Risk Level:".cyan().bold(),
            Self::risk_colored(decision.risk_level)
        ));
        if !decision.identified_risks.is_empty() {
            output.push_str(&format!("\n{}\n", "Identified Risks:".yellow().bold()));
            for risk in &decision.identified_risks {
                output.push_str(&format!("  * {}\n", risk));
            }
        }
        if !decision.citations.is_empty() {
            output.push_str(&format!("\n{}\n", "Citations:".cyan().bold()));
            for citation in &decision.citations {
                output.push_str(&format!("  [{}]\n", citation));
            }
        }
        output.push_str(&format!(
            "\n{} {}ms\n",
            "Processing Time:".dimmed(),
            decision.processing_time_ms
        ));

        output.push_str(&Self::footer());

        output
    }

    /// Format a blocked verdict
    pub fn format_blocked(blocked: &BlockedDecision) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n\n", "=== Query Blocked ===".red().bold()));
        output.push_str(&format!("{} {}\n", "Reason:".bold(), blocked.block_reason));
        if !blocked.matched_patterns.is_empty() {
            output.push_str(&format!(
                "{} {}\n",
                "Matched:".bold(),
                blocked.matched_patterns.join(", ")
            ));
        }
        output.push_str(&format!(
            "\n{}\n",
            "This query was rejected by the safety gate before any agent ran.".dimmed()
        ));

        output
    }

    /// Format as JSON
    pub fn format_json(verdict: &Verdict) -> String {
        serde_json::to_string_pretty(verdict).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the answer only (concise output)
    pub fn format_answer_only(decision: &Decision) -> String {
        let mut output = String::new();

        output.push_str(decision.final_text());
        output.push('\n');

        output.push_str(&format!(
            "\n{}\n",
            format!(
                "[confidence {:.0}% | risk {} | {}]",
                decision.confidence * 100.0,
                decision.risk_level,
                decision.selected_response.agent_type
            )
            .dimmed()
        ));

        output
    }

    /// One-line status of an in-flight generation snapshot, suitable for
    /// carriage-return redraw during staged runs
    pub fn format_stage_status(responses: &[council_domain::AgentResponse]) -> String {
        responses
            .iter()
            .map(|r| {
                if r.is_error() {
                    format!("{}: failed", r.agent_type)
                } else {
                    format!("{}: {} chars", r.agent_type, r.text.len())
                }
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn risk_colored(level: RiskLevel) -> ColoredString {
        let text = level.to_string();
        match level {
            RiskLevel::Low => text.green(),
            RiskLevel::Medium => text.yellow(),
            RiskLevel::High => text.red(),
            RiskLevel::Critical => text.red().bold(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use council_domain::AgentResponse;

    fn sample_decision() -> Decision {
        let selected = AgentResponse::new("agent_analytical", "Analytical", "the answer", 0.3, 120);
        Decision {
            decision_id: "abc12345".to_string(),
            timestamp: Utc::now(),
            query: "Should we ship?".to_string(),
            agent_responses: vec![selected.clone()],
            judge_evaluations: vec![],
            selected_response: selected.clone(),
            refined_response: Some(selected.refined("the refined answer", 80)),
            confidence: 0.85,
            risk_level: RiskLevel::Medium,
            identified_risks: vec!["Low agreement between evaluators".to_string()],
            citations: vec!["RFC 2119".to_string()],
            selection_rationale: "Selected Analytical with score 8.5/10".to_string(),
            retry_feedback: String::new(),
            processing_time_ms: 1234,
            safety_passed: true,
            judge_disagreement: false,
            was_refined: true,
            was_retried: false,
        }
    }

    #[test]
    fn test_full_format_contains_sections() {
        colored::control::set_override(false);
        let out = ConsoleFormatter::format(&sample_decision());
        assert!(out.contains("Phase 1: Agent Drafts"));
        assert!(out.contains("Phase 2: Judge Scores"));
        assert!(out.contains("Phase 3: Final Answer"));
        assert!(out.contains("the refined answer"));
        assert!(out.contains("85%"));
        assert!(out.contains("MEDIUM"));
        assert!(out.contains("RFC 2119"));
    }

    #[test]
    fn test_answer_only_shows_final_text_first() {
        colored::control::set_override(false);
        let out = ConsoleFormatter::format_answer_only(&sample_decision());
        assert!(out.starts_with("the refined answer"));
        assert!(out.contains("confidence 85%"));
    }

    #[test]
    fn test_blocked_format() {
        colored::control::set_override(false);
        let blocked = BlockedDecision {
            decision_id: "def67890".to_string(),
            timestamp: Utc::now(),
            query: "bad".to_string(),
            block_reason: "Query too short (min 3 chars)".to_string(),
            matched_patterns: vec![],
        };
        let out = ConsoleFormatter::format_blocked(&blocked);
        assert!(out.contains("Query Blocked"));
        assert!(out.contains("Query too short"));
    }

    #[test]
    fn test_stage_status_line() {
        let responses = vec![
            AgentResponse::new("agent_a", "Analytical", "partial tex", 0.3, 0),
            AgentResponse::failure("agent_b", "Creative", 0.9, "timeout", 0),
        ];
        let status = ConsoleFormatter::format_stage_status(&responses);
        assert_eq!(status, "Analytical: 11 chars | Creative: failed");
    }

    #[test]
    fn test_json_format_is_valid() {
        let verdict = Verdict::Decided(Box::new(sample_decision()));
        let json = ConsoleFormatter::format_json(&verdict);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "decided");
    }
}
