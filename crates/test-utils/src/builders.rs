#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use pipewright::config::{
    CommandConfig, PipelineFile, ProducerConfig, RawPipelineFile, SettingsSection,
};
use pipewright::logging::OutputLogLevel;

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineFileBuilder {
    config: RawPipelineFile,
}

impl PipelineFileBuilder {
    pub fn new(command: &[&str]) -> Self {
        Self {
            config: RawPipelineFile {
                settings: SettingsSection::default(),
                producers: Vec::new(),
                command: CommandConfigBuilder::new(command).build(),
            },
        }
    }

    pub fn with_command(mut self, command: CommandConfig) -> Self {
        self.config.command = command;
        self
    }

    pub fn with_producer(mut self, producer: ProducerConfig) -> Self {
        self.config.producers.push(producer);
        self
    }

    pub fn wrapped_tool(mut self, tool: &str) -> Self {
        self.config.settings.wrapped_tool = Some(tool.to_string());
        self
    }

    pub fn output_log_level(mut self, level: OutputLogLevel) -> Self {
        self.config.settings.output_log_level = level;
        self
    }

    pub fn raw(self) -> RawPipelineFile {
        self.config
    }

    pub fn build(self) -> PipelineFile {
        PipelineFile::try_from(self.config).expect("Failed to build valid pipeline from builder")
    }
}

/// Builder for a `[[producer]]` entry.
pub struct ProducerConfigBuilder {
    producer: ProducerConfig,
}

impl ProducerConfigBuilder {
    pub fn new(name: &str, command: &[&str]) -> Self {
        Self {
            producer: ProducerConfig {
                name: name.to_string(),
                command: command.iter().map(|s| s.to_string()).collect(),
                shell: false,
                environment: BTreeMap::new(),
                working_directory: None,
            },
        }
    }

    pub fn shell(mut self, val: bool) -> Self {
        self.producer.shell = val;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.producer
            .environment
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ProducerConfig {
        self.producer
    }
}

/// Builder for the `[command]` section.
pub struct CommandConfigBuilder {
    command: CommandConfig,
}

impl CommandConfigBuilder {
    pub fn new(command: &[&str]) -> Self {
        Self {
            command: CommandConfig {
                command: command.iter().map(|s| s.to_string()).collect(),
                shell: false,
                environment: BTreeMap::new(),
                working_directory: None,
                stdin_from: None,
                input_file: None,
                output_file: None,
                inherit_output: false,
            },
        }
    }

    pub fn shell(mut self, val: bool) -> Self {
        self.command.shell = val;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command
            .environment
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn stdin_from(mut self, producer: &str) -> Self {
        self.command.stdin_from = Some(producer.to_string());
        self
    }

    pub fn input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.command.input_file = Some(path.into());
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.command.output_file = Some(path.into());
        self
    }

    pub fn inherit_output(mut self, val: bool) -> Self {
        self.command.inherit_output = val;
        self
    }

    pub fn build(self) -> CommandConfig {
        self.command
    }
}
