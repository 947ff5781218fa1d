//! Configuration adapters: TOML schema and multi-source loading

pub mod file_config;
pub mod loader;

pub use file_config::{
    FileAgentEntry, FileAuditConfig, FileBackendConfig, FileBehaviorConfig, FileConfig,
    FileJudgeEntry, FileRubric, FileRubricDimension,
};
pub use loader::ConfigLoader;
