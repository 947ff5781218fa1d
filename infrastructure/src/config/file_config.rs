//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the `council.toml`
//! config file. They are deserialized directly and converted into the
//! application-layer [`CouncilConfig`] before any validation runs.
//!
//! # Example
//!
//! ```toml
//! [[agents]]
//! id = "agent_analytical"
//! type = "Analytical"
//! role_prompt = "You are a rigorous analyst. Argue from evidence."
//! temperature = 0.3
//!
//! [[judges]]
//! id = "judge_factuality"
//! type = "Factuality"
//! [judges.rubric.dimensions.accuracy]
//! weight = 0.4
//! description = "Are the claims correct?"
//!
//! [safety]
//! blocked_keywords = ["how to hack"]
//! min_query_length = 3
//! max_query_length = 1000
//!
//! [behavior]
//! confidence_threshold = 0.6
//! max_retries = 1
//! ```

use council_application::CouncilConfig;
use council_domain::{AgentIdentity, JudgeIdentity, Rubric, RubricDimension, SafetyRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Generation agent roster
    pub agents: Vec<FileAgentEntry>,
    /// Evaluation judge roster
    pub judges: Vec<FileJudgeEntry>,
    /// Safety gate rules
    pub safety: SafetyRules,
    /// Pipeline behavior knobs
    pub behavior: FileBehaviorConfig,
    /// Audit trail settings
    pub audit: FileAuditConfig,
    /// Live backend settings
    pub backend: FileBackendConfig,
}

/// One `[[agents]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAgentEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub display_type: String,
    pub role_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.5
}

/// One `[[judges]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileJudgeEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub judge_type: String,
    pub rubric: FileRubric,
}

/// A rubric under a judge entry. The name defaults to the judge type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRubric {
    pub name: Option<String>,
    pub dimensions: BTreeMap<String, FileRubricDimension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRubricDimension {
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

/// Raw `[behavior]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBehaviorConfig {
    pub confidence_threshold: f64,
    pub max_retries: u32,
    pub disagreement_threshold: f64,
    pub skip_synthesis: bool,
    pub backend_timeout_secs: u64,
    pub stream_poll_interval_ms: u64,
}

impl Default for FileBehaviorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            max_retries: 1,
            disagreement_threshold: 3.0,
            skip_synthesis: false,
            backend_timeout_secs: 60,
            stream_poll_interval_ms: 50,
        }
    }
}

/// Raw `[audit]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuditConfig {
    pub enabled: bool,
    /// JSONL file the decision trail is appended to
    pub path: String,
}

impl Default for FileAuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "council_audit.jsonl".to_string(),
        }
    }
}

/// Raw `[backend]` section (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    pub base_url: String,
    /// Model used for generation and refinement
    pub model: String,
    /// Model used by the judges
    pub judge_model: String,
    /// Environment variable holding the API key; never the key itself
    pub api_key_env: String,
    pub max_tokens: u32,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ai.megallm.io/v1".to_string(),
            model: "gpt-4o".to_string(),
            judge_model: "gpt-4o".to_string(),
            api_key_env: "MEGALLM_API_KEY".to_string(),
            max_tokens: 1024,
        }
    }
}

impl Default for FileConfig {
    /// Built-in defaults: a three-agent panel with contrasting
    /// temperaments and a Factuality plus Safety judge pair.
    fn default() -> Self {
        Self {
            agents: vec![
                FileAgentEntry {
                    id: "agent_analytical".to_string(),
                    display_type: "Analytical".to_string(),
                    role_prompt: "You are a rigorous analytical advisor. Argue from data and \
                                  evidence, quantify tradeoffs, and state your assumptions."
                        .to_string(),
                    temperature: 0.3,
                },
                FileAgentEntry {
                    id: "agent_creative".to_string(),
                    display_type: "Creative".to_string(),
                    role_prompt: "You are a creative advisor. Challenge the framing of the \
                                  question and propose unconventional alternatives."
                        .to_string(),
                    temperature: 0.9,
                },
                FileAgentEntry {
                    id: "agent_pragmatist".to_string(),
                    display_type: "Pragmatist".to_string(),
                    role_prompt: "You are a pragmatic operational advisor. Focus on execution, \
                                  cost, and what can actually be done with current resources."
                        .to_string(),
                    temperature: 0.5,
                },
            ],
            judges: vec![
                FileJudgeEntry {
                    id: "judge_factuality".to_string(),
                    judge_type: "Factuality".to_string(),
                    rubric: FileRubric {
                        name: None,
                        dimensions: BTreeMap::from([
                            (
                                "accuracy".to_string(),
                                FileRubricDimension {
                                    weight: 0.4,
                                    description: "Are the claims correct?".to_string(),
                                },
                            ),
                            (
                                "evidence".to_string(),
                                FileRubricDimension {
                                    weight: 0.3,
                                    description: "Are the claims supported by sources or data?"
                                        .to_string(),
                                },
                            ),
                            (
                                "completeness".to_string(),
                                FileRubricDimension {
                                    weight: 0.3,
                                    description: "Does the answer cover the important aspects?"
                                        .to_string(),
                                },
                            ),
                        ]),
                    },
                },
                FileJudgeEntry {
                    id: "judge_safety".to_string(),
                    judge_type: "Safety".to_string(),
                    rubric: FileRubric {
                        name: None,
                        dimensions: BTreeMap::from([
                            (
                                "harmlessness".to_string(),
                                FileRubricDimension {
                                    weight: 0.6,
                                    description: "Could following this answer cause harm?"
                                        .to_string(),
                                },
                            ),
                            (
                                "ethics".to_string(),
                                FileRubricDimension {
                                    weight: 0.4,
                                    description: "Is the answer ethically sound?".to_string(),
                                },
                            ),
                        ]),
                    },
                },
            ],
            safety: SafetyRules {
                blocked_keywords: vec![
                    "how to hack".to_string(),
                    "build a weapon".to_string(),
                    "synthesize drugs".to_string(),
                ],
                blocked_patterns: vec![],
                allowlist_patterns: vec![],
                min_query_length: 3,
                max_query_length: 1000,
            },
            behavior: FileBehaviorConfig::default(),
            audit: FileAuditConfig::default(),
            backend: FileBackendConfig::default(),
        }
    }
}

impl FileConfig {
    /// Convert the raw file structure into the application configuration.
    ///
    /// Pure mapping; validation happens when the orchestrator is built.
    pub fn to_council_config(&self) -> CouncilConfig {
        let agents = self
            .agents
            .iter()
            .map(|entry| {
                AgentIdentity::new(
                    &entry.id,
                    &entry.display_type,
                    &entry.role_prompt,
                    entry.temperature,
                )
            })
            .collect();

        let judges = self
            .judges
            .iter()
            .map(|entry| {
                let name = entry.rubric.name.clone().unwrap_or(entry.judge_type.clone());
                let mut rubric = Rubric::new(name);
                for (dimension, config) in &entry.rubric.dimensions {
                    rubric = rubric.with_dimension(
                        dimension,
                        RubricDimension::new(config.weight, &config.description),
                    );
                }
                JudgeIdentity::new(&entry.id, &entry.judge_type, rubric)
            })
            .collect();

        CouncilConfig {
            agents,
            judges,
            safety_rules: self.safety.clone(),
            confidence_threshold: self.behavior.confidence_threshold,
            max_retries: self.behavior.max_retries,
            disagreement_threshold: self.behavior.disagreement_threshold,
            skip_synthesis: self.behavior.skip_synthesis,
            backend_timeout: Duration::from_secs(self.behavior.backend_timeout_secs),
            stream_poll_interval: Duration::from_millis(self.behavior.stream_poll_interval_ms),
        }
    }
}
