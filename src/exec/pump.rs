// src/exec/pump.rs

//! Reading the output of running processes.
//!
//! Every output stream gets its own reader task that forwards complete lines
//! over a shared channel, so a silent stream never holds up a chatty one and
//! no pipe buffer fills up. A process launched with `Output::Capture` has a
//! single stream carrying both stdout and stderr, so its lines arrive in the
//! order it wrote them. Lines of separate streams (a producer's stderr next
//! to the terminal command's output, say) may interleave.
//!
//! While reading, the pump also polls every supervised process. The first
//! process whose exit code counts as an error ends the pump: its remaining
//! output is collected, every other process still running is killed, and a
//! `ProcessFailed` error carrying the last lines it wrote is returned.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, timeout_at};
use tracing::{debug, warn};

use crate::errors::{PipewrightError, Result};
use crate::exec::exit_code::exit_code_indicates_error;
use crate::exec::process::{OutputStream, ProcessExit, ProcessHandle};
use crate::logging::{OutputLogLevel, log_at};

/// Number of trailing output lines kept per process for error reports.
pub const ERROR_OUTPUT_MAX_LINE_COUNT: usize = 10;

/// Marker put in front of an error report whose trailing buffer overflowed.
pub const TRUNCATION_MARKER: &str = "...";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a failed process's readers get to deliver their last lines.
const STRAGGLER_TIMEOUT: Duration = Duration::from_secs(1);

/// Sliding window over the most recent lines of a process.
///
/// Holds at most [`ERROR_OUTPUT_MAX_LINE_COUNT`] lines; pushing onto a full
/// buffer evicts the oldest line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastLines {
    lines: VecDeque<String>,
}

impl LastLines {
    pub fn new() -> Self {
        Self {
            lines: VecDeque::with_capacity(ERROR_OUTPUT_MAX_LINE_COUNT),
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == ERROR_OUTPUT_MAX_LINE_COUNT {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lines.len() == ERROR_OUTPUT_MAX_LINE_COUNT
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// The buffered lines joined with `\n`, led by [`TRUNCATION_MARKER`] when
    /// the buffer is full and earlier output may have been dropped.
    pub fn to_error_output(&self) -> String {
        let marker = self.is_full().then_some(TRUNCATION_MARKER);
        marker
            .into_iter()
            .chain(self.iter())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Route one line of process output.
///
/// The line always lands in `last_lines`. With a concrete level it is logged
/// right away; with [`OutputLogLevel::Withhold`] it goes to `captured`
/// instead and nothing is logged.
pub fn record_line(
    last_lines: &mut LastLines,
    captured: &mut Vec<String>,
    line: String,
    output_log_level: OutputLogLevel,
) {
    match output_log_level {
        OutputLogLevel::Log(level) => log_at(level, &line),
        OutputLogLevel::Withhold => captured.push(line.clone()),
    }
    last_lines.push(line);
}

/// Captured text per process, keyed by the process's position in the slice
/// handed to [`log_outputs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutputs {
    outputs: HashMap<usize, String>,
}

impl CapturedOutputs {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.outputs.get(&index).map(String::as_str)
    }

    pub fn take(&mut self, index: usize) -> Option<String> {
        self.outputs.remove(&index)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// One line read from a stream, still raw, tagged with its process index.
#[derive(Debug)]
struct StreamLine {
    process: usize,
    bytes: Vec<u8>,
}

/// Per-process line bookkeeping for one pump invocation.
struct PumpState {
    output_log_level: OutputLogLevel,
    last_lines: Vec<LastLines>,
    captured: Vec<Vec<String>>,
}

impl PumpState {
    fn new(process_count: usize, output_log_level: OutputLogLevel) -> Self {
        Self {
            output_log_level,
            last_lines: vec![LastLines::new(); process_count],
            captured: vec![Vec::new(); process_count],
        }
    }

    fn record(&mut self, line: StreamLine) {
        let text = decode_line(&line.bytes);
        record_line(
            &mut self.last_lines[line.process],
            &mut self.captured[line.process],
            text,
            self.output_log_level,
        );
    }

    fn into_captured_outputs(self) -> CapturedOutputs {
        if self.output_log_level != OutputLogLevel::Withhold {
            return CapturedOutputs::default();
        }

        let outputs = self
            .captured
            .into_iter()
            .enumerate()
            .map(|(index, lines)| (index, lines.join("\n")))
            .collect();
        CapturedOutputs { outputs }
    }
}

/// Pump the output of `processes` until every stream is drained and every
/// process has exited.
///
/// Streams already taken from a handle (for example a stdout that feeds
/// another command's stdin, or one redirected to a file) are not read. A
/// process with no streams left is only polled for its exit.
///
/// Returns captured text for every process when `output_log_level` is
/// [`OutputLogLevel::Withhold`], and an empty map otherwise.
pub async fn log_outputs(
    processes: &mut [&mut dyn ProcessHandle],
    output_log_level: OutputLogLevel,
    wrapped_tool: Option<&str>,
) -> Result<CapturedOutputs> {
    let (tx, mut rx) = mpsc::unbounded_channel::<StreamLine>();

    let mut readers: Vec<Vec<JoinHandle<()>>> = Vec::with_capacity(processes.len());
    for (index, process) in processes.iter_mut().enumerate() {
        let streams = [process.take_stdout(), process.take_stderr()];
        readers.push(
            streams
                .into_iter()
                .flatten()
                .map(|stream| spawn_reader(index, stream, tx.clone()))
                .collect(),
        );
    }
    drop(tx);

    let mut state = PumpState::new(processes.len(), output_log_level);
    let mut exits: Vec<Option<ProcessExit>> = vec![None; processes.len()];
    let mut streams_open = true;

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = rx.recv(), if streams_open => {
                match received {
                    Some(line) => {
                        state.record(line);
                        continue;
                    }
                    None => streams_open = false,
                }
            }
            _ = ticker.tick() => {}
        }

        for index in 0..processes.len() {
            if exits[index].is_some() {
                continue;
            }

            let exit = match processes[index].poll() {
                Ok(Some(exit)) => exit,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        command = %processes[index].command(),
                        error = %err,
                        "failed to poll process; killing the rest"
                    );
                    kill_others(processes, &exits, index);
                    abort_readers(&readers);
                    return Err(err.into());
                }
            };
            exits[index] = Some(exit);

            debug!(
                command = %processes[index].command(),
                exit_code = ?exit.code,
                "process exited"
            );

            if exit_code_indicates_error(processes[index].command(), exit.code, wrapped_tool) {
                collect_stragglers(&mut readers[index], &mut rx, &mut state).await;
                kill_others(processes, &exits, index);
                abort_readers(&readers);

                return Err(PipewrightError::ProcessFailed {
                    command: processes[index].command().to_string(),
                    exit_code: exit.code,
                    output: state.last_lines[index].to_error_output(),
                });
            }
        }

        if !streams_open && exits.iter().all(Option::is_some) {
            break;
        }
    }

    Ok(state.into_captured_outputs())
}

/// Read every stream to the end and return all bytes decoded as one string,
/// chunks appended in the order they arrived.
pub async fn collect_output(streams: Vec<OutputStream>) -> String {
    let (tx, mut rx) = mpsc::unbounded_channel::<StreamLine>();
    for stream in streams {
        spawn_reader(0, stream, tx.clone());
    }
    drop(tx);

    let mut bytes = Vec::new();
    while let Some(line) = rx.recv().await {
        bytes.extend_from_slice(&line.bytes);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Request termination of `process` unless it already finished.
///
/// Failures are logged and swallowed.
pub fn kill_if_running(process: &mut dyn ProcessHandle) {
    if let Ok(Some(_)) = process.poll() {
        return;
    }

    if let Err(err) = process.kill() {
        debug!(
            command = %process.command(),
            error = %err,
            "failed to kill process"
        );
    }
}

/// Strip the line terminator and decode lossily.
///
/// The terminator is `\n`; on windows a `\r\n` pair is stripped as a whole.
/// Elsewhere a `\r` before the `\n` is part of the line.
pub fn decode_line(bytes: &[u8]) -> String {
    let mut bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    if cfg!(windows) {
        bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn spawn_reader(
    process: usize,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<StreamLine>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);

        loop {
            let mut bytes = Vec::new();
            match reader.read_until(b'\n', &mut bytes).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(StreamLine { process, bytes }).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!(process, error = %err, "error reading process output; closing stream");
                    break;
                }
            }
        }
    })
}

/// Give the readers of a failed process a bounded amount of time to finish,
/// then record everything that is already queued.
async fn collect_stragglers(
    readers: &mut [JoinHandle<()>],
    rx: &mut mpsc::UnboundedReceiver<StreamLine>,
    state: &mut PumpState,
) {
    let deadline = Instant::now() + STRAGGLER_TIMEOUT;
    for handle in readers.iter_mut() {
        if timeout_at(deadline, &mut *handle).await.is_err() {
            handle.abort();
        }
    }

    while let Ok(line) = rx.try_recv() {
        state.record(line);
    }
}

fn kill_others(
    processes: &mut [&mut dyn ProcessHandle],
    exits: &[Option<ProcessExit>],
    failed: usize,
) {
    for (index, process) in processes.iter_mut().enumerate() {
        if index == failed || exits[index].is_some() {
            continue;
        }
        kill_if_running(&mut **process);
    }
}

fn abort_readers(readers: &[Vec<JoinHandle<()>>]) {
    for handle in readers.iter().flatten() {
        handle.abort();
    }
}
