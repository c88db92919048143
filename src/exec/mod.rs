// src/exec/mod.rs

//! Process execution layer.
//!
//! This module launches external programs with `tokio::process::Command`,
//! streams their output into `tracing`, and decides from exit codes whether
//! they failed.
//!
//! - [`command`] holds `CommandLine` and the redacted command rendering.
//! - [`exit_code`] classifies exit codes as error or not.
//! - [`options`] describes how a command is launched.
//! - `pipe` creates the single pipe shared by a child's stdout and stderr.
//! - [`process`] provides the `ProcessHandle` trait and `ChildProcess`.
//! - [`pump`] reads live output streams and supervises running processes.
//! - [`executor`] runs one command.
//! - [`pipeline`] runs a command fed by upstream processes.

pub mod command;
pub mod executor;
pub mod exit_code;
pub mod options;
mod pipe;
pub mod pipeline;
pub mod process;
pub mod pump;

pub use command::{CommandLine, format_command, log_command};
pub use executor::{Execution, execute_command, execute_command_and_capture_output, spawn_command};
pub use exit_code::exit_code_indicates_error;
pub use options::{CaptureOptions, ExecuteOptions, Input, Output};
pub use pipeline::execute_command_with_processes;
pub use process::{ChildProcess, OutputStream, ProcessExit, ProcessHandle};
pub use pump::{CapturedOutputs, LastLines, log_outputs};
