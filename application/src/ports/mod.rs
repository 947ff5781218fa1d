//! Port definitions
//!
//! Interfaces the decision pipeline consumes. Implementations (adapters)
//! live in the infrastructure layer; test doubles implement the same
//! traits.

pub mod audit;
pub mod evaluation;
pub mod generation;
pub mod progress;
