//! CLI commands

pub mod aliases;
pub mod compile;
pub mod completions;
pub mod config;
pub mod import;
pub mod input;
pub mod optimize;
pub mod query;
pub mod validate;
