// src/exec/options.rs

//! Launch options for the executors.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::ChildStdout;

use crate::exec::pipe::combined_pipe;
use crate::exec::process::{ChildProcess, OutputStream};
use crate::logging::OutputLogLevel;

/// Where a command's stdin comes from.
#[derive(Debug, Default)]
pub enum Input {
    /// Inherit the parent's stdin.
    #[default]
    Inherit,
    /// Read from an already opened file.
    File { name: String, file: File },
    /// Read from the stdout of an upstream process.
    Pipe(ChildStdout),
}

impl Input {
    /// Open `path` for reading.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        Ok(Input::File {
            name: path.display().to_string(),
            file: File::open(path)?,
        })
    }

    /// Use the stdout of `process` as input.
    ///
    /// Returns `None` unless the process was launched with [`Output::Pipe`]
    /// and nobody took its stdout yet.
    pub fn from_process(process: &mut ChildProcess) -> Option<Self> {
        process.take_stdout_pipe().map(Input::Pipe)
    }

    /// Name used in the `< name` annotation of the logged command.
    pub fn name(&self) -> Option<&str> {
        match self {
            Input::Inherit => None,
            Input::File { name, .. } => Some(name.as_str()),
            Input::Pipe(_) => Some("pipe"),
        }
    }

    pub(crate) fn into_stdio(self) -> io::Result<Stdio> {
        match self {
            Input::Inherit => Ok(Stdio::inherit()),
            Input::File { file, .. } => Ok(Stdio::from(file)),
            Input::Pipe(stdout) => stdout.try_into(),
        }
    }
}

/// Where a command's stdout (and stderr) go.
#[derive(Debug, Default)]
pub enum Output {
    /// Send stdout and stderr into one pipe that we read as the process's
    /// single output stream.
    #[default]
    Capture,
    /// Pipe stdout on its own so it can feed another command's stdin (see
    /// [`Input::from_process`]); stderr gets a pipe of its own and is read.
    Pipe,
    /// Write stdout to a file; stderr is still piped back and read.
    File { name: String, file: File },
    /// Let the process write to the host's stdout and stderr directly.
    DoNotCapture,
}

impl Output {
    /// Create (or truncate) `path` and send stdout there.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        Ok(Output::File {
            name: path.display().to_string(),
            file: File::create(path)?,
        })
    }

    /// Name used in the `> name` annotation of the logged command.
    pub fn name(&self) -> Option<&str> {
        match self {
            Output::File { name, .. } => Some(name.as_str()),
            Output::Capture | Output::Pipe | Output::DoNotCapture => None,
        }
    }

    pub fn is_captured(&self) -> bool {
        !matches!(self, Output::DoNotCapture)
    }

    pub(crate) fn into_stdio(self) -> io::Result<OutputStdio> {
        let separate = |stdout: Stdio, stderr: Stdio| OutputStdio {
            stdout,
            stderr,
            combined: None,
        };

        match self {
            Output::Capture => Ok(match combined_pipe()? {
                Some(pipe) => OutputStdio {
                    stdout: pipe.stdout,
                    stderr: pipe.stderr,
                    combined: Some(pipe.reader),
                },
                None => separate(Stdio::piped(), Stdio::piped()),
            }),
            Output::Pipe => Ok(separate(Stdio::piped(), Stdio::piped())),
            Output::File { file, .. } => Ok(separate(Stdio::from(file), Stdio::piped())),
            Output::DoNotCapture => Ok(separate(Stdio::inherit(), Stdio::inherit())),
        }
    }
}

/// Child stdout/stderr for one launch, plus the read end of the combined
/// pipe when both share one.
pub(crate) struct OutputStdio {
    pub stdout: Stdio,
    pub stderr: Stdio,
    pub combined: Option<OutputStream>,
}

/// Everything that controls how a single command is launched and supervised.
#[derive(Debug)]
pub struct ExecuteOptions {
    pub input: Input,
    pub output: Output,
    pub output_log_level: OutputLogLevel,
    /// Variables added on top of the current environment.
    pub extra_environment: Option<BTreeMap<String, String>>,
    /// Join the command with spaces and run it through the shell.
    pub shell: bool,
    pub working_directory: Option<PathBuf>,
    /// When `false`, launch and hand back the live process without reading
    /// its output or waiting for it.
    pub run_to_completion: bool,
    /// Program whose exit code 1 is a warning rather than an error.
    pub wrapped_tool: Option<String>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            input: Input::Inherit,
            output: Output::Capture,
            output_log_level: OutputLogLevel::default(),
            extra_environment: None,
            shell: false,
            working_directory: None,
            run_to_completion: true,
            wrapped_tool: None,
        }
    }
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: Input) -> Self {
        self.input = input;
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn output_log_level(mut self, level: impl Into<OutputLogLevel>) -> Self {
        self.output_log_level = level.into();
        self
    }

    pub fn extra_environment(mut self, env: BTreeMap<String, String>) -> Self {
        self.extra_environment = Some(env);
        self
    }

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn run_to_completion(mut self, run_to_completion: bool) -> Self {
        self.run_to_completion = run_to_completion;
        self
    }

    pub fn wrapped_tool(mut self, tool: impl Into<String>) -> Self {
        self.wrapped_tool = Some(tool.into());
        self
    }
}

/// Options for `execute_command_and_capture_output`.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Capture stderr together with stdout instead of letting it through.
    pub capture_stderr: bool,
    pub extra_environment: Option<BTreeMap<String, String>>,
    pub shell: bool,
    pub working_directory: Option<PathBuf>,
    pub wrapped_tool: Option<String>,
}

/// The environment a child should get, or `None` to inherit ours untouched.
///
/// The result is a fresh map: the current environment with `extra` laid on
/// top. An absent or empty `extra` yields `None`.
pub fn merged_environment(
    extra: Option<&BTreeMap<String, String>>,
) -> Option<BTreeMap<OsString, OsString>> {
    let extra = extra.filter(|env| !env.is_empty())?;

    let mut merged: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
    for (key, value) in extra {
        merged.insert(OsString::from(key), OsString::from(value));
    }
    Some(merged)
}
