// src/exec/command.rs

//! Command representation and the redacted, loggable rendering of a command.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

/// Placeholder printed instead of environment variable values.
pub const REDACTED: &str = "***";

/// A command as it is handed to the process launcher.
///
/// In shell mode the arguments are joined with single spaces and passed to
/// the shell as one string. No escaping happens; callers quote themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Args(Vec<String>),
    Shell(String),
}

impl CommandLine {
    pub fn new<S: AsRef<str>>(full_command: &[S], shell: bool) -> Self {
        let args: Vec<String> = full_command.iter().map(|a| a.as_ref().to_string()).collect();
        if shell {
            CommandLine::Shell(args.join(" "))
        } else {
            CommandLine::Args(args)
        }
    }

    /// The program being run: the first argument, or the first
    /// space-separated token of a shell string.
    pub fn program(&self) -> Option<&str> {
        match self {
            CommandLine::Args(args) => args.first().map(String::as_str),
            CommandLine::Shell(line) => line.split(' ').next().filter(|s| !s.is_empty()),
        }
    }

    pub fn is_shell(&self) -> bool {
        matches!(self, CommandLine::Shell(_))
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Args(args) => f.write_str(&args.join(" ")),
            CommandLine::Shell(line) => f.write_str(line),
        }
    }
}

/// Render a command for logging.
///
/// Every extra environment variable shows up as `NAME=***` in front of the
/// command, and `< input` / `> output` annotations are appended when those
/// redirections were given.
pub fn format_command<S: AsRef<str>>(
    full_command: &[S],
    input_name: Option<&str>,
    output_name: Option<&str>,
    extra_environment: Option<&BTreeMap<String, String>>,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(full_command.len() + 4);

    if let Some(env) = extra_environment {
        parts.extend(env.keys().map(|key| format!("{key}={REDACTED}")));
    }

    parts.extend(full_command.iter().map(|a| a.as_ref().to_string()));

    if let Some(name) = input_name {
        parts.push(format!("< {name}"));
    }
    if let Some(name) = output_name {
        parts.push(format!("> {name}"));
    }

    parts.join(" ")
}

/// Log the rendered command at debug level, right before it is launched.
pub fn log_command<S: AsRef<str>>(
    full_command: &[S],
    input_name: Option<&str>,
    output_name: Option<&str>,
    extra_environment: Option<&BTreeMap<String, String>>,
) {
    debug!(
        "{}",
        format_command(full_command, input_name, output_name, extra_environment)
    );
}
