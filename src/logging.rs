// src/logging.rs

//! Logging setup for `scopewatch` using `tracing` + `tracing-subscriber`.
//!
//! The engine itself only emits `tracing` events; hosts that do not install
//! their own subscriber can call [`init_logging`] once at startup.
//!
//! Priority for determining the log level:
//! 1. explicit level (e.g. from the `[logging]` config section)
//! 2. `SCOPEWATCH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::config::ConfigFile;
use crate::types::LogLevel;

/// Initialise the global logging subscriber.
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(level: Option<LogLevel>) -> Result<()> {
    let level = match level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("SCOPEWATCH_LOG")
            .ok()
            .and_then(|s| s.parse::<LogLevel>().ok())
            .map(level_from_log_level)
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}

/// Initialise logging from the `[logging]` section of a loaded config.
pub fn init_from_config(cfg: &ConfigFile) -> Result<()> {
    init_logging(cfg.logging.level)
}

pub(crate) fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}
