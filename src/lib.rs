// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate};
use crate::config::model::PipelineFile;
use crate::errors::{PipewrightError, Result};
use crate::exec::{
    ChildProcess, ExecuteOptions, Input, Output, ProcessHandle, execute_command,
    execute_command_with_processes, format_command, spawn_command,
};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline file loading
/// - dry-run printing (nothing is launched)
/// - producer launch and terminal command execution
/// - printing captured output to stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.unwrap_or_else(default_config_path);
    debug!(path = %config_path.display(), "loading pipeline file");
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    if let Some(output) = run_pipeline(&cfg).await? {
        println!("{output}");
    }

    Ok(())
}

/// Launch every producer, then run the terminal command to completion.
///
/// Producers are started with `run_to_completion = false`; the one named by
/// `stdin_from` keeps its stdout apart from its stderr so it can feed the
/// terminal command. Without producers the terminal command goes through
/// `execute_command`, otherwise through `execute_command_with_processes`.
/// Returns the captured output when the output log level is `none`.
pub async fn run_pipeline(cfg: &PipelineFile) -> Result<Option<String>> {
    info!(
        producers = cfg.producers.len(),
        command = %cfg.command.command.join(" "),
        "starting pipeline"
    );

    let mut producers: Vec<ChildProcess> = Vec::with_capacity(cfg.producers.len());
    let stdin_producer = cfg.stdin_producer();
    for (index, producer) in cfg.producers.iter().enumerate() {
        let mut options = ExecuteOptions::new()
            .shell(producer.shell)
            .extra_environment(producer.environment.clone());
        if stdin_producer == Some(index) {
            options = options.output(Output::Pipe);
        }
        if let Some(dir) = cfg.effective_working_directory(producer.working_directory.as_ref()) {
            options = options.working_directory(dir);
        }
        if let Some(tool) = cfg.settings.wrapped_tool.as_deref() {
            options = options.wrapped_tool(tool);
        }

        debug!(producer = %producer.name, "launching producer");
        producers.push(spawn_command(&producer.command, options)?);
    }

    let options = terminal_options(cfg, &mut producers)?;

    if producers.is_empty() {
        let execution = execute_command(&cfg.command.command, options).await?;
        return Ok(execution.into_output());
    }

    let mut handles: Vec<&mut dyn ProcessHandle> = producers
        .iter_mut()
        .map(|p| p as &mut dyn ProcessHandle)
        .collect();

    execute_command_with_processes(&cfg.command.command, &mut handles, options).await
}

fn terminal_options(cfg: &PipelineFile, producers: &mut [ChildProcess]) -> Result<ExecuteOptions> {
    let command = &cfg.command;

    let mut options = ExecuteOptions::new()
        .shell(command.shell)
        .extra_environment(command.environment.clone())
        .output_log_level(cfg.settings.output_log_level);

    if let Some(dir) = cfg.effective_working_directory(command.working_directory.as_ref()) {
        options = options.working_directory(dir);
    }
    if let Some(tool) = cfg.settings.wrapped_tool.as_deref() {
        options = options.wrapped_tool(tool);
    }

    if let Some(index) = cfg.stdin_producer() {
        let input = Input::from_process(&mut producers[index]).ok_or_else(|| {
            PipewrightError::Other(anyhow!(
                "producer '{}' has no stdout left to pipe",
                cfg.producers[index].name
            ))
        })?;
        options = options.input(input);
    } else if let Some(path) = command.input_file.as_ref() {
        options = options.input(Input::open(path)?);
    }

    if command.inherit_output {
        options = options.output(Output::DoNotCapture);
    } else if let Some(path) = command.output_file.as_ref() {
        options = options.output(Output::create(path)?);
    }

    Ok(options)
}

/// Dry-run output: print every command as it would be logged.
fn print_dry_run(cfg: &PipelineFile) {
    println!("pipewright dry-run (nothing is launched)");
    if let Some(tool) = cfg.settings.wrapped_tool.as_deref() {
        println!("  settings.wrapped_tool = {tool}");
    }
    println!(
        "  settings.output_log_level = {:?}",
        cfg.settings.output_log_level
    );
    println!();

    println!("producers ({}):", cfg.producers.len());
    for producer in cfg.producers.iter() {
        println!(
            "  - {}: {}",
            producer.name,
            format_command(&producer.command, None, None, Some(&producer.environment))
        );
    }

    let command = &cfg.command;
    let input_name = command
        .stdin_from
        .clone()
        .or_else(|| command.input_file.as_ref().map(|p| p.display().to_string()));
    let output_name = command
        .output_file
        .as_ref()
        .map(|p| p.display().to_string());

    println!("command:");
    println!(
        "  {}",
        format_command(
            &command.command,
            input_name.as_deref(),
            output_name.as_deref(),
            Some(&command.environment),
        )
    );

    debug!("dry-run complete (no execution)");
}
