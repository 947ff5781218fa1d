//! Backend adapters implementing the application ports

#[cfg(feature = "http-backend")]
pub mod openai_compat;
pub mod scripted;

#[cfg(feature = "http-backend")]
pub use openai_compat::{OpenAiCompatBackend, ProviderError};
pub use scripted::{MockEvaluation, MockGeneration, ScriptedEvaluation, ScriptedGeneration};
