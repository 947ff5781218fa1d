//! Application use cases

pub mod decide;
