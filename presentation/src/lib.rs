//! Presentation layer for llm-council
//!
//! CLI argument parsing, console output formatting, and progress
//! reporting. Depends on the domain and application layers only.

pub mod cli;
pub mod output;
pub mod progress;

pub use cli::{Cli, Command, OutputFormat};
pub use output::ConsoleFormatter;
pub use progress::{ProgressReporter, SimpleProgress};
