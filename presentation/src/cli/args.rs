//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for council decisions
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Full formatted output with drafts, scores, and risks
    Full,
    /// Only the final answer
    Answer,
    /// JSON output
    Json,
}

/// CLI arguments for llm-council
#[derive(Parser, Debug)]
#[command(name = "llm-council")]
#[command(author, version, about = "Multi-agent council that debates, scores, and answers a query")]
#[command(long_about = r#"
llm-council runs a decision pipeline over a panel of generation agents:

1. Safety gate: the query is screened against keyword and pattern rules
2. Generation: every agent drafts an answer in parallel
3. Evaluation: every judge scores every draft against a weighted rubric
4. Selection:  the highest-scoring draft wins (deterministic tie-break)
5. Synthesis:  the winner is refined with the other drafts' perspectives
6. Risk:       the decision is classified LOW / MEDIUM / HIGH / CRITICAL

Configuration files are loaded from (in priority order):
1. --config <path>    Explicit config file
2. ./council.toml     Project-level config
3. ~/.config/llm-council/config.toml   Global config

Examples:
  llm-council "Should we migrate the database this quarter?"
  llm-council --mock --stream "Should we adopt a four day work week?"
  llm-council --output json "Is feature-flagging worth the complexity?"
  llm-council stats --recent 10
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// The query to put before the council
    pub query: Option<String>,

    /// Use offline mock backends (no API key, no network)
    #[arg(long)]
    pub mock: bool,

    /// Stream intermediate pipeline stages as they happen
    #[arg(short, long)]
    pub stream: bool,

    /// Skip the refinement pass and answer with the winning draft
    #[arg(long)]
    pub no_refine: bool,

    /// Cap the answer length in words (advisory, passed to backends)
    #[arg(long, value_name = "WORDS")]
    pub word_limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show statistics over the audit trail
    Stats {
        /// Number of recent decisions to list
        #[arg(long, default_value_t = 5)]
        recent: usize,
    },
}
