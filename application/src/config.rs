//! Council configuration
//!
//! [`CouncilConfig`] is the explicit configuration value constructed once
//! at startup and passed by reference into every component that needs it.
//! There is no hidden global state: the agent roster, judge rubrics, and
//! safety rules are immutable for the lifetime of the orchestrator.

use council_domain::{AgentIdentity, DomainError, JudgeIdentity, SafetyRules};
use std::time::Duration;
use thiserror::Error;

/// Default confidence below which the single-shot retry is considered
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Default judge-total spread above which judges are flagged as disagreeing
pub const DEFAULT_DISAGREEMENT_THRESHOLD: f64 = 3.0;

/// Configuration errors are fatal at construction time: the orchestrator
/// refuses to start with an incomplete or invalid setup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No agents configured")]
    NoAgents,

    #[error("No judges configured")]
    NoJudges,

    #[error("Missing required rubric: {0}")]
    MissingRubric(String),

    #[error("Confidence threshold must be within 0..=1, got {0}")]
    InvalidConfidenceThreshold(f64),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Immutable configuration for one council
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    /// Generation agents, in panel-declaration order
    pub agents: Vec<AgentIdentity>,
    /// Evaluation judges, in panel-declaration order
    pub judges: Vec<JudgeIdentity>,
    /// Safety-gate rules
    pub safety_rules: SafetyRules,

    /// Below this confidence the retry branch is considered
    pub confidence_threshold: f64,
    /// Retry budget; the pipeline never uses more than one retry
    pub max_retries: u32,
    /// Judge-total spread that counts as disagreement
    pub disagreement_threshold: f64,
    /// Skip the refinement pass entirely
    pub skip_synthesis: bool,

    /// Deadline applied to every backend call; a timed-out call takes
    /// the same captured-failure path as any other backend error
    pub backend_timeout: Duration,
    /// How often the staged mode publishes generation snapshots
    pub stream_poll_interval: Duration,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            judges: Vec::new(),
            safety_rules: SafetyRules::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_retries: 1,
            disagreement_threshold: DEFAULT_DISAGREEMENT_THRESHOLD,
            skip_synthesis: false,
            backend_timeout: Duration::from_secs(60),
            stream_poll_interval: Duration::from_millis(50),
        }
    }
}

impl CouncilConfig {
    /// Fail-fast validation, run at orchestrator construction.
    ///
    /// Requires a non-empty agent and judge roster, a Factuality and a
    /// Safety rubric, normalized rubric weights, and a confidence
    /// threshold within 0..=1. Safety-rule regexes are compiled (and
    /// thereby validated) separately when the gate is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.is_empty() {
            return Err(ConfigError::NoAgents);
        }
        if self.judges.is_empty() {
            return Err(ConfigError::NoJudges);
        }

        for required in ["Factuality", "Safety"] {
            if !self
                .judges
                .iter()
                .any(|j| j.rubric.name.eq_ignore_ascii_case(required))
            {
                return Err(ConfigError::MissingRubric(required.to_string()));
            }
        }

        for judge in &self.judges {
            judge.rubric.validate()?;
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.confidence_threshold,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::{Rubric, RubricDimension};

    fn rubric(name: &str) -> Rubric {
        Rubric::new(name).with_dimension("quality", RubricDimension::new(1.0, "overall"))
    }

    fn valid_config() -> CouncilConfig {
        CouncilConfig {
            agents: vec![AgentIdentity::new(
                "agent_analytical",
                "Analytical",
                "You are rigorous.",
                0.3,
            )],
            judges: vec![
                JudgeIdentity::new("judge_factuality", "Factuality", rubric("Factuality")),
                JudgeIdentity::new("judge_safety", "Safety", rubric("Safety")),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_agents_rejected() {
        let mut config = valid_config();
        config.agents.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoAgents)));
    }

    #[test]
    fn test_empty_judges_rejected() {
        let mut config = valid_config();
        config.judges.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoJudges)));
    }

    #[test]
    fn test_missing_safety_rubric_rejected() {
        let mut config = valid_config();
        config.judges.retain(|j| j.rubric.name != "Safety");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRubric(name)) if name == "Safety"
        ));
    }

    #[test]
    fn test_invalid_rubric_weights_rejected() {
        let mut config = valid_config();
        config.judges[0].rubric = Rubric::new("Factuality")
            .with_dimension("quality", RubricDimension::new(0.4, ""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let mut config = valid_config();
        config.confidence_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfidenceThreshold(_))
        ));
    }
}
