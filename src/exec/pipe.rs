// src/exec/pipe.rs

//! One OS pipe shared by a child's stdout and stderr.
//!
//! Both descriptors of the child point at the same write end, so bytes come
//! out of the read end in exactly the order the process wrote them.

use std::io;
use std::process::Stdio;

use crate::exec::process::OutputStream;

/// Child-side handles of a combined pipe plus our read end.
pub(crate) struct CombinedPipe {
    pub stdout: Stdio,
    pub stderr: Stdio,
    pub reader: OutputStream,
}

/// Create a combined output pipe. Must be called inside a tokio runtime.
///
/// Returns `Ok(None)` on platforms without one, where callers fall back to
/// two separate pipes.
#[cfg(unix)]
pub(crate) fn combined_pipe() -> io::Result<Option<CombinedPipe>> {
    use tokio::net::unix::pipe;

    let (sender, receiver) = pipe::pipe()?;
    let write_end = sender.into_blocking_fd()?;
    let stderr = write_end.try_clone()?;

    Ok(Some(CombinedPipe {
        stdout: Stdio::from(write_end),
        stderr: Stdio::from(stderr),
        reader: Box::pin(receiver),
    }))
}

#[cfg(not(unix))]
pub(crate) fn combined_pipe() -> io::Result<Option<CombinedPipe>> {
    Ok(None)
}
