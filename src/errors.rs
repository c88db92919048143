// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipewrightError {
    /// A launched process finished with an exit code classified as an error.
    ///
    /// `output` holds the trailing lines the process wrote before failing.
    #[error("Command '{command}' {}", describe_exit(.exit_code))]
    ProcessFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// The executable could not be started at all.
    #[error("Failed to launch '{command}': {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipewrightError {
    /// Exit code of the failed process, if this is a process failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipewrightError::ProcessFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Output captured from the failed process, if this is a process failure.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            PipewrightError::ProcessFailed { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match *exit_code {
        Some(code) if code < 0 => format!("died with signal {}", -code),
        Some(code) => format!("returned non-zero exit status {code}"),
        None => "exited without reporting an exit status".to_string(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipewrightError>;
