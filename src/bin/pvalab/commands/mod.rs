//! Subcommand implementations.

pub mod analyze;
pub mod batch;
pub mod marks;
pub mod types;
pub mod validate;
