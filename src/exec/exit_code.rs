// src/exec/exit_code.rs

//! Deciding whether a process exit code means failure.
//!
//! The wrapped backup tool exits with 1 to report "finished, with warnings".
//! That code is only tolerated when the command being run *is* that tool;
//! any other program exiting with 1 has failed.

use std::path::Path;

use crate::exec::command::CommandLine;

/// Exit code the wrapped tool uses for "completed with warnings".
pub const WARNING_EXIT_CODE: i32 = 1;

/// Return `true` when `exit_code` should be treated as a failure of `command`.
///
/// - no exit code at all is an error
/// - negative codes (killed by a signal) are errors
/// - `0` is never an error
/// - `1` is an error unless the program is `wrapped_tool`
/// - any other positive code is an error
pub fn exit_code_indicates_error(
    command: &CommandLine,
    exit_code: Option<i32>,
    wrapped_tool: Option<&str>,
) -> bool {
    let Some(code) = exit_code else {
        return true;
    };

    match code {
        c if c < 0 => true,
        0 => false,
        WARNING_EXIT_CODE => !is_wrapped_tool(command, wrapped_tool),
        _ => true,
    }
}

/// String comparison of the command's program against the configured tool
/// path, either verbatim or by basename. Symlinks and wrappers are not
/// resolved.
fn is_wrapped_tool(command: &CommandLine, wrapped_tool: Option<&str>) -> bool {
    let (Some(tool), Some(program)) = (wrapped_tool.filter(|t| !t.is_empty()), command.program())
    else {
        return false;
    };

    if program == tool {
        return true;
    }

    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == tool)
}
