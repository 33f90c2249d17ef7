//! CLI library components for the panel pipeline.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod prompt;
pub mod types;
