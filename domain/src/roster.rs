//! Static panel rosters
//!
//! Identities of the configured generation agents and evaluation judges.
//! Loaded once at orchestrator construction and never mutated during
//! execution.

use crate::rubric::Rubric;
use serde::{Deserialize, Serialize};

/// Identity of a configured generation agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Stable identifier (e.g. "agent_analytical")
    pub id: String,
    /// Display type (e.g. "Analytical")
    pub display_type: String,
    /// System role text sent with every generation call
    pub role_prompt: String,
    /// Generation temperature. Tags the output; the orchestrator does
    /// not interpret it.
    pub temperature: f32,
}

impl AgentIdentity {
    pub fn new(
        id: impl Into<String>,
        display_type: impl Into<String>,
        role_prompt: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            id: id.into(),
            display_type: display_type.into(),
            role_prompt: role_prompt.into(),
            temperature,
        }
    }
}

/// Identity of a configured evaluation judge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeIdentity {
    /// Stable identifier (e.g. "judge_factuality")
    pub id: String,
    /// Judge type (e.g. "Factuality", "Safety")
    pub judge_type: String,
    /// Weighted rubric this judge scores against
    pub rubric: Rubric,
}

impl JudgeIdentity {
    pub fn new(id: impl Into<String>, judge_type: impl Into<String>, rubric: Rubric) -> Self {
        Self {
            id: id.into(),
            judge_type: judge_type.into(),
            rubric,
        }
    }

    /// Whether this judge's evaluations feed safety-risk detection
    pub fn is_safety_judge(&self) -> bool {
        self.judge_type.eq_ignore_ascii_case("safety")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_judge_detection() {
        let judge = JudgeIdentity::new("judge_safety", "Safety", Rubric::new("Safety"));
        assert!(judge.is_safety_judge());

        let judge = JudgeIdentity::new("judge_factuality", "Factuality", Rubric::new("Factuality"));
        assert!(!judge.is_safety_judge());
    }
}
