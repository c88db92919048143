use std::fs;
use std::io::Write;

use tempfile::{NamedTempFile, tempdir};

use pipewright::cli::CliArgs;
use pipewright::errors::PipewrightError;
use pipewright::logging::OutputLogLevel;
use pipewright::{run, run_pipeline};
use pipewright_test_utils::builders::{
    CommandConfigBuilder, PipelineFileBuilder, ProducerConfigBuilder,
};

use crate::common::{init_tracing, with_timeout};

#[tokio::test]
async fn runs_a_single_command() {
    init_tracing();

    let cfg = PipelineFileBuilder::new(&["echo", "hello"])
        .output_log_level(OutputLogLevel::Withhold)
        .build();

    let output = with_timeout(run_pipeline(&cfg)).await.unwrap();
    assert_eq!(output.as_deref(), Some("hello"));
}

#[tokio::test]
async fn logged_output_is_not_returned() {
    init_tracing();

    let cfg = PipelineFileBuilder::new(&["echo", "hello"]).build();

    let output = with_timeout(run_pipeline(&cfg)).await.unwrap();
    assert_eq!(output, None);
}

#[tokio::test]
async fn producer_feeds_the_terminal_command() {
    init_tracing();

    let cfg = PipelineFileBuilder::new(&["cat"])
        .with_producer(
            ProducerConfigBuilder::new("dump", &["echo", "$PW_ROW"])
                .shell(true)
                .env("PW_ROW", "row-1")
                .build(),
        )
        .with_command(
            CommandConfigBuilder::new(&["tr", "a-z", "A-Z"])
                .stdin_from("dump")
                .build(),
        )
        .output_log_level(OutputLogLevel::Withhold)
        .build();

    let output = with_timeout(run_pipeline(&cfg)).await.unwrap();
    assert_eq!(output.as_deref(), Some("ROW-1"));
}

#[tokio::test]
async fn failing_producer_fails_the_pipeline() {
    init_tracing();

    let cfg = PipelineFileBuilder::new(&["sleep", "5"])
        .with_producer(
            ProducerConfigBuilder::new("dump", &["sh", "-c", "echo dump failed 1>&2; exit 3"])
                .build(),
        )
        .build();

    let err = with_timeout(run_pipeline(&cfg)).await.unwrap_err();

    match err {
        PipewrightError::ProcessFailed {
            exit_code, output, ..
        } => {
            assert_eq!(exit_code, Some(3));
            assert_eq!(output, "dump failed");
        }
        other => panic!("Expected ProcessFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn warning_exit_of_wrapped_tool_is_tolerated() {
    init_tracing();

    let cfg = PipelineFileBuilder::new(&["sh", "-c", "echo warned; exit 1"])
        .wrapped_tool("sh")
        .output_log_level(OutputLogLevel::Withhold)
        .build();

    let output = with_timeout(run_pipeline(&cfg)).await.unwrap();
    assert_eq!(output.as_deref(), Some("warned"));
}

#[tokio::test]
async fn input_and_output_files_are_wired_up() {
    init_tracing();

    let dir = tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, "copied\n").unwrap();

    let cfg = PipelineFileBuilder::new(&["cat"])
        .with_command(
            CommandConfigBuilder::new(&["cat"])
                .input_file(&input)
                .output_file(&output)
                .build(),
        )
        .output_log_level(OutputLogLevel::Withhold)
        .build();

    let captured = with_timeout(run_pipeline(&cfg)).await.unwrap();

    assert_eq!(captured.as_deref(), Some(""));
    assert_eq!(fs::read_to_string(&output).unwrap(), "copied\n");
}

#[tokio::test]
async fn inherited_output_only_checks_the_exit_code() {
    init_tracing();

    let cfg = PipelineFileBuilder::new(&["true"])
        .with_command(CommandConfigBuilder::new(&["true"]).inherit_output(true).build())
        .build();

    let output = with_timeout(run_pipeline(&cfg)).await.unwrap();
    assert_eq!(output, None);
}

#[tokio::test]
async fn dry_run_launches_nothing() {
    init_tracing();

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[command]
command = ["/nonexistent/pipewright-no-such-program"]
"#
    )
    .unwrap();

    let args = CliArgs {
        config: Some(file.path().to_path_buf()),
        log_level: None,
        dry_run: true,
    };

    with_timeout(run(args)).await.unwrap();
}

#[tokio::test]
async fn run_reports_launch_failures() {
    init_tracing();

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[command]
command = ["/nonexistent/pipewright-no-such-program"]
"#
    )
    .unwrap();

    let args = CliArgs {
        config: Some(file.path().to_path_buf()),
        log_level: None,
        dry_run: false,
    };

    let err = with_timeout(run(args)).await.unwrap_err();
    assert!(matches!(err, PipewrightError::LaunchFailed { .. }));
}
