// src/exec/process.rs

//! Handles to launched processes.
//!
//! The executors and the output pump only talk to [`ProcessHandle`], so a
//! pipeline can supervise any mix of real children and test doubles.
//! [`ChildProcess`] is the production implementation over
//! `tokio::process::Child`.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::ExitStatus;

use tokio::io::AsyncRead;
use tokio::process::{Child, ChildStdout};

use crate::exec::command::CommandLine;

/// A readable output stream of a process.
pub type OutputStream = Pin<Box<dyn AsyncRead + Send>>;

/// How a process finished.
///
/// `code` is `None` when the platform could not report an exit code. On unix
/// a process killed by signal `N` reports `-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self {
                    code: Some(-signal),
                };
            }
        }

        Self {
            code: status.code(),
        }
    }
}

/// Capabilities the executors need from a launched process.
pub trait ProcessHandle: Send {
    /// The command this process was started with.
    fn command(&self) -> &CommandLine;

    /// Take the stdout stream, if it is piped and nobody took it yet. When
    /// stderr shares the pipe, this is the combined stream.
    fn take_stdout(&mut self) -> Option<OutputStream>;

    /// Take the stderr stream, if it is piped and nobody took it yet.
    fn take_stderr(&mut self) -> Option<OutputStream>;

    /// Check for completion without blocking. `Ok(None)` means still running.
    fn poll(&mut self) -> io::Result<Option<ProcessExit>>;

    /// Request termination. Does not wait for the process to go away.
    fn kill(&mut self) -> io::Result<()>;

    /// Wait for the process to finish.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send + '_>>;
}

/// A real OS process launched by this crate.
pub struct ChildProcess {
    command: CommandLine,
    child: Child,
    /// Read end of the pipe shared by stdout and stderr, if there is one.
    combined: Option<OutputStream>,
}

impl fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildProcess")
            .field("command", &self.command)
            .field("child", &self.child)
            .field("combined", &self.combined.is_some())
            .finish()
    }
}

impl ChildProcess {
    pub(crate) fn new(command: CommandLine, child: Child, combined: Option<OutputStream>) -> Self {
        Self {
            command,
            child,
            combined,
        }
    }

    /// OS process id, `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take the raw stdout pipe so it can become another command's stdin.
    ///
    /// Once taken, the stream is no longer visible to the output pump, which
    /// then reads only this process's stderr.
    pub fn take_stdout_pipe(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }
}

impl ProcessHandle for ChildProcess {
    fn command(&self) -> &CommandLine {
        &self.command
    }

    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.child
            .stdout
            .take()
            .map(|s| Box::pin(s) as OutputStream)
            .or_else(|| self.combined.take())
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        self.child
            .stderr
            .take()
            .map(|s| Box::pin(s) as OutputStream)
    }

    fn poll(&mut self) -> io::Result<Option<ProcessExit>> {
        Ok(self.child.try_wait()?.map(ProcessExit::from))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send + '_>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(ProcessExit::from(status))
        })
    }
}
