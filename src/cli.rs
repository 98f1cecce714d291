// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `gendag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gendag",
    version,
    about = "Generate code outputs from a schema and documents, in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `gendag.toml` in the working directory.
    #[arg(long, value_name = "PATH", default_value = "gendag.toml")]
    pub config: String,

    /// Keep running and regenerate affected outputs when files change.
    ///
    /// Watch mode is also enabled when the config sets `watch`.
    #[arg(long, short)]
    pub watch: bool,

    /// Working directory that relative pointers and patterns resolve against.
    ///
    /// Defaults to the process working directory.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Maximum number of outputs generated at the same time.
    ///
    /// Overrides `[config].concurrency`.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GENDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the generation order and watch plan, but
    /// don't run any plugin.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
