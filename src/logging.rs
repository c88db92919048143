// src/logging.rs

//! Logging setup for `pipewright` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PIPEWRIGHT_LOG` environment variable (e.g. "answer", "debug")
//! 3. default to `info`
//!
//! Besides the standard levels there is an "answer" level that sits between
//! INFO and WARN. `tracing` has a fixed set of levels, so answer events are
//! emitted at INFO under the [`ANSWER_TARGET`] target, and the `answer`
//! verbosity is expressed as a filter directive that lets only that target
//! through at INFO.
//!
//! Logs are sent to STDERR so that stdout can carry captured command output.

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Target used for answer-level events.
pub const ANSWER_TARGET: &str = "pipewright::answer";

/// Environment variable consulted when no explicit level is given.
pub const LOG_ENV_VAR: &str = "PIPEWRIGHT_LOG";

static INIT: Once = Once::new();

/// Log severity, ordered from least to most verbose.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    /// Summary output that should stay visible without the rest of INFO.
    Answer,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Answer => "answer",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_level_str(s).ok_or_else(|| {
            format!("invalid log level: {s} (expected error, warn, answer, info, debug or trace)")
        })
    }
}

/// Where the lines a process writes should go.
///
/// - `Log(level)`: every line is logged as soon as it is read.
/// - `Withhold`: nothing is logged; lines are collected and handed back to
///   the caller as captured output.
///
/// Letting the process write straight to the host terminal is a property of
/// the output sink, see `exec::Output::DoNotCapture`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum OutputLogLevel {
    Log(LogLevel),
    Withhold,
}

impl Default for OutputLogLevel {
    fn default() -> Self {
        OutputLogLevel::Log(LogLevel::Info)
    }
}

impl From<LogLevel> for OutputLogLevel {
    fn from(level: LogLevel) -> Self {
        OutputLogLevel::Log(level)
    }
}

impl FromStr for OutputLogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(OutputLogLevel::Withhold),
            other => other.parse::<LogLevel>().map(OutputLogLevel::Log),
        }
    }
}

impl TryFrom<String> for OutputLogLevel {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Emit `message` at the given level.
pub fn log_at(level: LogLevel, message: &str) {
    match level {
        LogLevel::Error => tracing::error!("{message}"),
        LogLevel::Warn => tracing::warn!("{message}"),
        LogLevel::Answer => tracing::info!(target: ANSWER_TARGET, "{message}"),
        LogLevel::Info => tracing::info!("{message}"),
        LogLevel::Debug => tracing::debug!("{message}"),
        LogLevel::Trace => tracing::trace!("{message}"),
    }
}

/// Initialise the global logging subscriber.
///
/// Idempotent: only the first call installs a subscriber, later calls return
/// `Ok(())` without touching the global state.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let mut outcome = Ok(());

    INIT.call_once(|| {
        let level = match cli_level {
            Some(lvl) => lvl,
            None => std::env::var(LOG_ENV_VAR)
                .ok()
                .and_then(|s| parse_level_str(&s))
                .unwrap_or(LogLevel::Info),
        };

        outcome = tracing_subscriber::fmt()
            .with_env_filter(filter_for_level(level))
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("installing logging subscriber: {e}"));
    });

    outcome
}

/// Build the filter that shows everything at `level` and above.
pub fn filter_for_level(level: LogLevel) -> EnvFilter {
    EnvFilter::new(filter_directive(level))
}

/// Filter directive string for a verbosity level.
pub fn filter_directive(level: LogLevel) -> String {
    match level {
        LogLevel::Answer => format!("warn,{ANSWER_TARGET}=info"),
        other => other.to_string(),
    }
}

fn parse_level_str(s: &str) -> Option<LogLevel> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "answer" => Some(LogLevel::Answer),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}
