use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pipewright::exec::{CommandLine, OutputStream, ProcessExit, ProcessHandle};

/// Exit reported by a fake process after it has been killed (SIGKILL).
pub const KILLED_EXIT_CODE: i32 = -9;

/// A scripted process for pipeline tests.
///
/// - stdout/stderr are fixed byte buffers, readable once
/// - `exit` is what `poll` reports; `None` means "still running" until the
///   process is killed
/// - every `kill` call is counted, shared through [`FakeProcess::kill_counter`]
pub struct FakeProcess {
    command: CommandLine,
    stdout: Option<Vec<u8>>,
    stderr: Option<Vec<u8>>,
    exit: Option<ProcessExit>,
    killed: bool,
    kills: Arc<AtomicUsize>,
}

impl FakeProcess {
    /// A process that never exits on its own.
    pub fn running(program: &str) -> Self {
        Self {
            command: CommandLine::new(&[program], false),
            stdout: None,
            stderr: None,
            exit: None,
            killed: false,
            kills: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A process that has already exited with `code`.
    pub fn exited(program: &str, code: i32) -> Self {
        let mut process = Self::running(program);
        process.exit = Some(ProcessExit::from_code(code));
        process
    }

    pub fn with_stdout(mut self, bytes: &[u8]) -> Self {
        self.stdout = Some(bytes.to_vec());
        self
    }

    pub fn with_stderr(mut self, bytes: &[u8]) -> Self {
        self.stderr = Some(bytes.to_vec());
        self
    }

    pub fn kill_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.kills)
    }

    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

impl ProcessHandle for FakeProcess {
    fn command(&self) -> &CommandLine {
        &self.command
    }

    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.stdout
            .take()
            .map(|bytes| Box::pin(io::Cursor::new(bytes)) as OutputStream)
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        self.stderr
            .take()
            .map(|bytes| Box::pin(io::Cursor::new(bytes)) as OutputStream)
    }

    fn poll(&mut self) -> io::Result<Option<ProcessExit>> {
        if self.killed {
            return Ok(Some(ProcessExit::from_code(KILLED_EXIT_CODE)));
        }
        Ok(self.exit)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.killed = true;
        Ok(())
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send + '_>> {
        Box::pin(async move {
            match self.poll()? {
                Some(exit) => Ok(exit),
                None => std::future::pending().await,
            }
        })
    }
}
