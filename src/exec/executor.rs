// src/exec/executor.rs

//! Running a single command.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{PipewrightError, Result};
use crate::exec::command::{CommandLine, log_command};
use crate::exec::exit_code::exit_code_indicates_error;
use crate::exec::options::{CaptureOptions, ExecuteOptions, Output, OutputStdio, merged_environment};
use crate::exec::process::{ChildProcess, OutputStream, ProcessExit, ProcessHandle};
use crate::exec::pump::{collect_output, log_outputs};
use crate::logging::OutputLogLevel;

/// Result of [`execute_command`].
#[derive(Debug)]
pub enum Execution {
    /// The command ran to completion. Holds the captured output when the
    /// output log level was `Withhold`.
    Finished(Option<String>),
    /// The command was launched with `run_to_completion = false`; the caller
    /// now owns the live process and must drain and await it.
    Running(ChildProcess),
}

impl Execution {
    pub fn into_output(self) -> Option<String> {
        match self {
            Execution::Finished(output) => output,
            Execution::Running(_) => None,
        }
    }

    pub fn into_process(self) -> Option<ChildProcess> {
        match self {
            Execution::Finished(_) => None,
            Execution::Running(process) => Some(process),
        }
    }
}

/// A freshly launched process plus the settings needed to supervise it.
pub(crate) struct Launched {
    pub process: ChildProcess,
    pub output_log_level: OutputLogLevel,
    pub wrapped_tool: Option<String>,
    pub captured: bool,
    pub run_to_completion: bool,
}

/// Log and launch `full_command` according to `options`. Does not wait.
pub(crate) fn launch<S: AsRef<str>>(full_command: &[S], options: ExecuteOptions) -> Result<Launched> {
    let ExecuteOptions {
        input,
        output,
        output_log_level,
        extra_environment,
        shell,
        working_directory,
        run_to_completion,
        wrapped_tool,
    } = options;

    log_command(
        full_command,
        input.name(),
        output.name(),
        extra_environment.as_ref(),
    );

    let command_line = CommandLine::new(full_command, shell);
    let captured = output.is_captured();
    let stdin = input.into_stdio()?;
    let output = output.into_stdio()?;

    let process = spawn(
        &command_line,
        Stdios {
            stdin,
            stdout: output.stdout,
            stderr: output.stderr,
            combined: output.combined,
        },
        extra_environment.as_ref(),
        working_directory.as_deref(),
    )?;

    Ok(Launched {
        process,
        output_log_level,
        wrapped_tool,
        captured,
        run_to_completion,
    })
}

/// Run `full_command`.
///
/// - With `run_to_completion = false` the live process is returned right
///   away, nothing is read and nothing is awaited.
/// - With `Output::DoNotCapture` the process writes to the host terminal; we
///   only wait for it and check its exit code.
/// - Otherwise the combined output is pumped at `output_log_level` until the
///   process exits, and its exit code is checked.
///
/// An erroring exit code becomes [`PipewrightError::ProcessFailed`].
pub async fn execute_command<S: AsRef<str>>(
    full_command: &[S],
    options: ExecuteOptions,
) -> Result<Execution> {
    let Launched {
        mut process,
        output_log_level,
        wrapped_tool,
        captured,
        run_to_completion,
    } = launch(full_command, options)?;

    if !run_to_completion {
        return Ok(Execution::Running(process));
    }

    if !captured {
        let exit = process.wait().await?;
        check_exit(&process, exit, wrapped_tool.as_deref())?;
        return Ok(Execution::Finished(None));
    }

    let mut processes: [&mut dyn ProcessHandle; 1] = [&mut process];
    let mut outputs = log_outputs(&mut processes, output_log_level, wrapped_tool.as_deref()).await?;

    Ok(Execution::Finished(outputs.take(0)))
}

/// Launch `full_command` and hand back the live process without waiting.
///
/// Shorthand for [`execute_command`] with `run_to_completion = false`.
pub fn spawn_command<S: AsRef<str>>(full_command: &[S], options: ExecuteOptions) -> Result<ChildProcess> {
    let launched = launch(full_command, options.run_to_completion(false))?;
    Ok(launched.process)
}

/// Run `full_command` to completion and return its stdout.
///
/// With `capture_stderr` the returned text is stdout and stderr combined,
/// otherwise stderr goes to the host terminal. Output is held in memory
/// without a size cap and is never logged.
///
/// If the exit code does not count as an error (exit code 1 of the wrapped
/// tool, say) the output is returned as if the command had succeeded.
pub async fn execute_command_and_capture_output<S: AsRef<str>>(
    full_command: &[S],
    options: &CaptureOptions,
) -> Result<String> {
    log_command(full_command, None, None, options.extra_environment.as_ref());

    let command_line = CommandLine::new(full_command, options.shell);
    let stdios = if options.capture_stderr {
        Output::Capture.into_stdio()?
    } else {
        OutputStdio {
            stdout: Stdio::piped(),
            stderr: Stdio::inherit(),
            combined: None,
        }
    };

    let mut process = spawn(
        &command_line,
        Stdios {
            stdin: Stdio::inherit(),
            stdout: stdios.stdout,
            stderr: stdios.stderr,
            combined: stdios.combined,
        },
        options.extra_environment.as_ref(),
        options.working_directory.as_deref(),
    )?;

    let streams = [process.take_stdout(), process.take_stderr()]
        .into_iter()
        .flatten()
        .collect();
    let output = collect_output(streams).await;
    let exit = process.wait().await?;

    if exit_code_indicates_error(process.command(), exit.code, options.wrapped_tool.as_deref()) {
        return Err(PipewrightError::ProcessFailed {
            command: process.command().to_string(),
            exit_code: exit.code,
            output,
        });
    }

    if exit.code != Some(0) {
        debug!(
            command = %process.command(),
            exit_code = ?exit.code,
            "exit code tolerated; returning captured output"
        );
    }

    Ok(output)
}

/// Turn an erroring exit into `ProcessFailed` with no captured output.
pub(crate) fn check_exit(
    process: &dyn ProcessHandle,
    exit: ProcessExit,
    wrapped_tool: Option<&str>,
) -> Result<()> {
    if exit_code_indicates_error(process.command(), exit.code, wrapped_tool) {
        return Err(PipewrightError::ProcessFailed {
            command: process.command().to_string(),
            exit_code: exit.code,
            output: String::new(),
        });
    }
    Ok(())
}

struct Stdios {
    stdin: Stdio,
    stdout: Stdio,
    stderr: Stdio,
    combined: Option<OutputStream>,
}

fn spawn(
    command_line: &CommandLine,
    stdios: Stdios,
    extra_environment: Option<&BTreeMap<String, String>>,
    working_directory: Option<&Path>,
) -> Result<ChildProcess> {
    let launch_failed = |source: io::Error| PipewrightError::LaunchFailed {
        command: command_line.to_string(),
        source,
    };

    let mut cmd = build_command(command_line).map_err(launch_failed)?;

    if let Some(environment) = merged_environment(extra_environment) {
        cmd.env_clear().envs(environment);
    }
    if let Some(dir) = working_directory {
        cmd.current_dir(dir);
    }

    cmd.stdin(stdios.stdin)
        .stdout(stdios.stdout)
        .stderr(stdios.stderr)
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(launch_failed)?;
    debug!(pid = ?child.id(), command = %command_line, "process launched");

    // `cmd` still holds our copies of the child's write ends; they must be
    // closed before the combined pipe can ever reach EOF.
    drop(cmd);

    Ok(ChildProcess::new(command_line.clone(), child, stdios.combined))
}

/// Build the launcher for a command, going through the platform shell in
/// shell mode.
fn build_command(command_line: &CommandLine) -> io::Result<Command> {
    match command_line {
        CommandLine::Shell(line) => {
            let cmd = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(line);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(line);
                c
            };
            Ok(cmd)
        }
        CommandLine::Args(args) => {
            let (program, rest) = args.split_first().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "empty command")
            })?;
            let mut cmd = Command::new(program);
            cmd.args(rest);
            Ok(cmd)
        }
    }
}
