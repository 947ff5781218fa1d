//! CLI argument definitions

pub mod args;

pub use args::{Cli, Command, OutputFormat};
