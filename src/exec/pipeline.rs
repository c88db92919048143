// src/exec/pipeline.rs

//! Running a command fed by already running upstream processes.
//!
//! Typical use: a producer launched with `run_to_completion = false`
//! (`borg extract --stdout`, `pg_dump`) streams into the terminal command
//! (`pg_restore`, `borg create`). The terminal command's stdin is usually the
//! producer's stdout, which then belongs to the terminal command and is not
//! read by the pump; the producer's stderr still is, so its pipe never fills.

use crate::errors::Result;
use crate::exec::executor::{Launched, launch};
use crate::exec::options::ExecuteOptions;
use crate::exec::process::ProcessHandle;
use crate::exec::pump::{kill_if_running, log_outputs};

/// Run `full_command` to completion while supervising `processes`.
///
/// Launch semantics are those of `execute_command`, except that the command
/// always runs to completion. The output of every upstream process is pumped
/// along with the terminal command's own. If launching fails, every upstream
/// process still running is killed before the launch error is returned; if
/// any participant exits with an erroring code, the others are killed and
/// that failure is returned.
///
/// Returns the terminal command's captured output when the output log level
/// is `Withhold`.
pub async fn execute_command_with_processes<S: AsRef<str>>(
    full_command: &[S],
    processes: &mut [&mut dyn ProcessHandle],
    options: ExecuteOptions,
) -> Result<Option<String>> {
    let launched = match launch(full_command, options.run_to_completion(true)) {
        Ok(launched) => launched,
        Err(err) => {
            kill_processes(processes);
            return Err(err);
        }
    };

    let Launched {
        process: mut terminal,
        output_log_level,
        wrapped_tool,
        ..
    } = launched;

    let mut supervised: Vec<&mut dyn ProcessHandle> = Vec::with_capacity(processes.len() + 1);
    for process in processes.iter_mut() {
        supervised.push(&mut **process);
    }
    supervised.push(&mut terminal);
    let terminal_index = supervised.len() - 1;

    let mut outputs =
        log_outputs(&mut supervised, output_log_level, wrapped_tool.as_deref()).await?;

    Ok(outputs.take(terminal_index))
}

/// Best-effort kill of every process that is still running.
pub fn kill_processes(processes: &mut [&mut dyn ProcessHandle]) {
    for process in processes.iter_mut() {
        kill_if_running(&mut **process);
    }
}
