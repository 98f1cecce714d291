// src/logging.rs

//! Logging setup for `gendag` using `tracing` + `tracing-subscriber`.
//!
//! The chosen level applies to gendag's own targets only; dependencies such
//! as `notify` stay at `warn`. Plugin stderr is logged under
//! [`PLUGIN_TARGET`], so `GENDAG_LOG="info,gendag::plugin=debug"` shows
//! plugin output without the rest of the debug noise.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `GENDAG_LOG`: either a bare level ("debug") or a full filter directive
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout stays free for the run summary.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Target used for lines a plugin writes to stderr.
pub const PLUGIN_TARGET: &str = "gendag::plugin";

const CRATE_TARGET: &str = "gendag";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var("GENDAG_LOG").ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(lvl) = cli_level {
        return Ok(crate_filter(level_from_log_level(lvl)));
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(crate_filter(Level::INFO)),
        Some(raw) => match parse_level_str(raw) {
            Some(level) => Ok(crate_filter(level)),
            None => EnvFilter::try_new(raw)
                .with_context(|| format!("invalid GENDAG_LOG filter {raw:?}")),
        },
    }
}

/// `level` for gendag itself, `warn` for everything else.
fn crate_filter(level: Level) -> EnvFilter {
    EnvFilter::new(format!(
        "warn,{CRATE_TARGET}={}",
        level.as_str().to_lowercase()
    ))
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
