// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::{PipewrightError, Result};
use crate::logging::OutputLogLevel;

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = PipewrightError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(PipelineFile::new_unchecked(
            raw.settings,
            raw.producers,
            raw.command,
        ))
    }
}

fn validate_raw_config(cfg: &RawPipelineFile) -> Result<()> {
    validate_commands(cfg)?;
    validate_producer_names(cfg)?;
    validate_input(cfg)?;
    validate_output(cfg)?;
    Ok(())
}

fn validate_commands(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.command.command.is_empty() {
        return Err(PipewrightError::ConfigError(
            "[command].command must not be empty".to_string(),
        ));
    }

    for producer in cfg.producers.iter() {
        if producer.command.is_empty() {
            return Err(PipewrightError::ConfigError(format!(
                "producer '{}' has an empty command",
                producer.name
            )));
        }
    }
    Ok(())
}

fn validate_producer_names(cfg: &RawPipelineFile) -> Result<()> {
    let mut seen = HashSet::new();
    for producer in cfg.producers.iter() {
        if producer.name.trim().is_empty() {
            return Err(PipewrightError::ConfigError(
                "every [[producer]] needs a non-empty name".to_string(),
            ));
        }
        if !seen.insert(producer.name.as_str()) {
            return Err(PipewrightError::ConfigError(format!(
                "duplicate producer name '{}'",
                producer.name
            )));
        }
    }
    Ok(())
}

fn validate_input(cfg: &RawPipelineFile) -> Result<()> {
    let command = &cfg.command;

    if command.stdin_from.is_some() && command.input_file.is_some() {
        return Err(PipewrightError::ConfigError(
            "[command] cannot set both `stdin_from` and `input_file`".to_string(),
        ));
    }

    if let Some(name) = command.stdin_from.as_deref() {
        if !cfg.producers.iter().any(|p| p.name == name) {
            return Err(PipewrightError::ConfigError(format!(
                "[command] has unknown producer '{}' in `stdin_from`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_output(cfg: &RawPipelineFile) -> Result<()> {
    let command = &cfg.command;

    if command.inherit_output && command.output_file.is_some() {
        return Err(PipewrightError::ConfigError(
            "[command] cannot set both `output_file` and `inherit_output`".to_string(),
        ));
    }

    if command.inherit_output && cfg.settings.output_log_level == OutputLogLevel::Withhold {
        return Err(PipewrightError::ConfigError(
            "output_log_level = \"none\" captures output, which `inherit_output` disables"
                .to_string(),
        ));
    }
    Ok(())
}
