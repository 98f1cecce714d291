// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Circular output dependency between: {}", outputs.join(" -> "))]
    CircularDependency { outputs: Vec<String> },

    #[error("Output not found: {0}")]
    UnknownOutput(String),

    #[error("Output '{output}' cannot be generated: dependency '{dependency}' failed: {reason}")]
    DependencyFailed {
        output: String,
        dependency: String,
        reason: Arc<anyhow::Error>,
    },

    #[error("Path contract violated: {0}")]
    PathContract(String),

    #[error("Pattern contract violated: {0}")]
    PatternContract(String),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CodegenError>;
