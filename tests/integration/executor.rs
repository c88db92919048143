use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::time::Duration;

use tempfile::{NamedTempFile, tempdir};

use pipewright::errors::PipewrightError;
use pipewright::exec::{
    ExecuteOptions, Execution, Input, Output, ProcessHandle, execute_command, log_outputs,
    spawn_command,
};
use pipewright::logging::{LogLevel, OutputLogLevel};
use pipewright_test_utils::captured_logs::CapturedLogs;

use crate::common::{init_tracing, interleaved_lines, interleaving_script, sh, with_timeout};

fn withheld() -> ExecuteOptions {
    ExecuteOptions::new().output_log_level(OutputLogLevel::Withhold)
}

#[tokio::test]
async fn withheld_output_is_returned_exactly() {
    init_tracing();

    let execution = with_timeout(execute_command(&sh("printf 'one\\n  two  \\nthree\\n'"), withheld()))
        .await
        .unwrap();

    assert_eq!(
        execution.into_output().as_deref(),
        Some("one\n  two  \nthree")
    );
}

#[tokio::test]
async fn withheld_output_keeps_stdout_and_stderr_in_write_order() {
    init_tracing();

    let output = with_timeout(execute_command(&sh(&interleaving_script(2000)), withheld()))
        .await
        .unwrap()
        .into_output()
        .unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, interleaved_lines(2000));
}

#[tokio::test]
async fn captured_process_has_no_separate_stdout_pipe() {
    init_tracing();

    let mut process = spawn_command(&sh("echo hi"), ExecuteOptions::new()).unwrap();

    assert!(process.take_stdout_pipe().is_none());
    assert!(process.take_stderr().is_none());
    assert!(process.take_stdout().is_some());
}

#[tokio::test]
async fn logged_output_is_not_returned() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber("info"));

    let execution = with_timeout(execute_command(
        &sh("echo logged-line"),
        ExecuteOptions::new().output_log_level(LogLevel::Info),
    ))
    .await
    .unwrap();

    assert!(matches!(execution, Execution::Finished(None)));
    assert!(logs.contents().contains("logged-line"));
}

#[tokio::test]
async fn withheld_output_never_reaches_the_log() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber("info"));

    let output = with_timeout(execute_command(&sh("echo withheld-line"), withheld()))
        .await
        .unwrap()
        .into_output();

    assert_eq!(output.as_deref(), Some("withheld-line"));
    assert!(!logs.contents().contains("withheld-line"));
}

#[tokio::test]
async fn command_is_logged_at_debug_with_secrets_redacted() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber("debug"));

    let mut env = BTreeMap::new();
    env.insert("PW_SECRET".to_string(), "hunter2".to_string());

    with_timeout(execute_command(
        &["true"],
        ExecuteOptions::new().extra_environment(env),
    ))
    .await
    .unwrap();

    let contents = logs.contents();
    assert!(contents.contains("DEBUG"));
    assert!(contents.contains("PW_SECRET=*** true"));
    assert!(!contents.contains("hunter2"));
}

#[tokio::test]
async fn extra_environment_is_merged_into_the_current_one() {
    init_tracing();

    let mut env = BTreeMap::new();
    env.insert("PW_EXTRA".to_string(), "extra-value".to_string());

    let output = with_timeout(execute_command(
        &sh("echo \"$PW_EXTRA\"; test -n \"$PATH\" && echo has-path"),
        withheld().extra_environment(env),
    ))
    .await
    .unwrap()
    .into_output();

    assert_eq!(output.as_deref(), Some("extra-value\nhas-path"));
}

#[tokio::test]
async fn runs_in_the_working_directory() {
    init_tracing();

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("marker.txt"), "in the right place\n").unwrap();

    let output = with_timeout(execute_command(
        &["cat", "marker.txt"],
        withheld().working_directory(dir.path()),
    ))
    .await
    .unwrap()
    .into_output();

    assert_eq!(output.as_deref(), Some("in the right place"));
}

#[tokio::test]
async fn shell_mode_joins_and_interprets_the_command() {
    init_tracing();

    let output = with_timeout(execute_command(
        &["echo", "$((1 + 2))", "|", "tr", "3", "x"],
        withheld().shell(true),
    ))
    .await
    .unwrap()
    .into_output();

    assert_eq!(output.as_deref(), Some("x"));
}

#[tokio::test]
async fn reads_stdin_from_an_input_file() {
    init_tracing();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "from the file").unwrap();

    let output = with_timeout(execute_command(
        &["cat"],
        withheld().input(Input::open(file.path()).unwrap()),
    ))
    .await
    .unwrap()
    .into_output();

    assert_eq!(output.as_deref(), Some("from the file"));
}

#[tokio::test]
async fn output_file_receives_stdout_while_stderr_is_still_read() {
    init_tracing();

    let dir = tempdir().unwrap();
    let path = dir.path().join("out.txt");

    let output = with_timeout(execute_command(
        &sh("echo to-file; echo to-stderr 1>&2"),
        withheld().output(Output::create(&path).unwrap()),
    ))
    .await
    .unwrap()
    .into_output();

    assert_eq!(output.as_deref(), Some("to-stderr"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "to-file\n");
}

#[tokio::test]
async fn failing_command_reports_exit_code_and_last_lines() {
    init_tracing();

    let err = with_timeout(execute_command(
        &sh("echo first; echo last; exit 3"),
        ExecuteOptions::new(),
    ))
    .await
    .unwrap_err();

    match err {
        PipewrightError::ProcessFailed {
            command,
            exit_code,
            output,
        } => {
            assert_eq!(command, "sh -c echo first; echo last; exit 3");
            assert_eq!(exit_code, Some(3));
            assert_eq!(output, "first\nlast");
        }
        other => panic!("Expected ProcessFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn long_failing_output_keeps_only_the_tail() {
    init_tracing();

    let err = with_timeout(execute_command(
        &sh("for i in 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15; do echo line$i; done; exit 2"),
        ExecuteOptions::new().output_log_level(LogLevel::Debug),
    ))
    .await
    .unwrap_err();

    let output = err.captured_output().unwrap().to_string();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[0], "...");
    assert_eq!(lines[1], "line6");
    assert_eq!(lines[10], "line15");
}

#[tokio::test]
async fn exit_code_one_of_the_wrapped_tool_is_a_warning() {
    init_tracing();

    let result = with_timeout(execute_command(
        &sh("echo warned; exit 1"),
        withheld().wrapped_tool("sh"),
    ))
    .await;

    assert_eq!(result.unwrap().into_output().as_deref(), Some("warned"));
}

#[tokio::test]
async fn exit_code_one_of_other_programs_is_an_error() {
    init_tracing();

    let err = with_timeout(execute_command(
        &sh("exit 1"),
        ExecuteOptions::new().wrapped_tool("borg"),
    ))
    .await
    .unwrap_err();

    assert_eq!(err.exit_code(), Some(1));
}

#[tokio::test]
async fn killed_by_signal_reports_negative_exit_code() {
    init_tracing();

    let err = with_timeout(execute_command(&sh("kill -9 $$"), ExecuteOptions::new()))
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), Some(-9));
}

#[tokio::test]
async fn do_not_capture_waits_and_checks_the_exit_code() {
    init_tracing();

    let execution = with_timeout(execute_command(
        &["true"],
        ExecuteOptions::new().output(Output::DoNotCapture),
    ))
    .await
    .unwrap();
    assert!(matches!(execution, Execution::Finished(None)));

    let err = with_timeout(execute_command(
        &sh("exit 4"),
        ExecuteOptions::new().output(Output::DoNotCapture),
    ))
    .await
    .unwrap_err();
    assert_eq!(err.exit_code(), Some(4));
}

#[tokio::test]
async fn missing_executable_is_a_launch_failure() {
    init_tracing();

    let err = with_timeout(execute_command(
        &["/nonexistent/pipewright-no-such-program"],
        ExecuteOptions::new(),
    ))
    .await
    .unwrap_err();

    match err {
        PipewrightError::LaunchFailed { command, .. } => {
            assert_eq!(command, "/nonexistent/pipewright-no-such-program");
        }
        other => panic!("Expected LaunchFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn empty_command_is_a_launch_failure() {
    init_tracing();

    let empty: [&str; 0] = [];
    let err = with_timeout(execute_command(&empty, ExecuteOptions::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, PipewrightError::LaunchFailed { .. }));
}

#[tokio::test]
async fn not_running_to_completion_returns_immediately() {
    init_tracing();

    let started = std::time::Instant::now();
    let execution = execute_command(
        &sh("sleep 0.3; echo later"),
        ExecuteOptions::new().run_to_completion(false),
    )
    .await
    .unwrap();
    assert!(started.elapsed() < Duration::from_millis(300));

    let mut process = execution.into_process().expect("live process");
    let mut processes: [&mut dyn ProcessHandle; 1] = [&mut process];
    let mut outputs = with_timeout(log_outputs(&mut processes, OutputLogLevel::Withhold, None))
        .await
        .unwrap();

    assert_eq!(outputs.take(0).as_deref(), Some("later"));
}

#[tokio::test]
async fn spawned_process_output_stays_readable() {
    init_tracing();

    let mut process = spawn_command(&sh("echo from-producer"), ExecuteOptions::new()).unwrap();
    assert!(process.id().is_some());

    let mut processes: [&mut dyn ProcessHandle; 1] = [&mut process];
    let outputs = with_timeout(log_outputs(&mut processes, OutputLogLevel::Withhold, None))
        .await
        .unwrap();

    assert_eq!(outputs.get(0), Some("from-producer"));
}
