// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::logging::OutputLogLevel;

/// Pipeline file as read from TOML, before validation.
///
/// ```toml
/// [settings]
/// wrapped_tool = "borg"
/// output_log_level = "answer"
///
/// [[producer]]
/// name = "extract"
/// command = ["borg", "extract", "--stdout", "repo::archive"]
///
/// [command]
/// command = ["pg_restore", "--no-password", "--dbname", "app"]
/// stdin_from = "extract"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub settings: SettingsSection,

    /// Upstream processes, from `[[producer]]` tables.
    #[serde(default, rename = "producer")]
    pub producers: Vec<ProducerConfig>,

    /// The terminal command from `[command]`.
    pub command: CommandConfig,
}

/// A validated pipeline file.
///
/// Only obtainable through `TryFrom<RawPipelineFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub settings: SettingsSection,
    pub producers: Vec<ProducerConfig>,
    pub command: CommandConfig,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(
        settings: SettingsSection,
        producers: Vec<ProducerConfig>,
        command: CommandConfig,
    ) -> Self {
        Self {
            settings,
            producers,
            command,
        }
    }

    /// Index of the producer whose stdout feeds the terminal command.
    pub fn stdin_producer(&self) -> Option<usize> {
        let name = self.command.stdin_from.as_deref()?;
        self.producers.iter().position(|p| p.name == name)
    }

    /// Working directory for a command: its own, else the global default.
    pub fn effective_working_directory(&self, own: Option<&PathBuf>) -> Option<PathBuf> {
        own.or(self.settings.working_directory.as_ref()).cloned()
    }
}

/// `[settings]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    /// Program whose exit code 1 means "finished with warnings".
    #[serde(default)]
    pub wrapped_tool: Option<String>,

    /// Level for command output lines, or `"none"` to capture and print it.
    #[serde(default)]
    pub output_log_level: OutputLogLevel,

    /// Default working directory for every command.
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

/// `[[producer]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProducerConfig {
    pub name: String,

    pub command: Vec<String>,

    #[serde(default)]
    pub shell: bool,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

/// `[command]` section: the terminal command.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub command: Vec<String>,

    #[serde(default)]
    pub shell: bool,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    /// Name of the producer whose stdout becomes this command's stdin.
    #[serde(default)]
    pub stdin_from: Option<String>,

    /// File to use as stdin.
    #[serde(default)]
    pub input_file: Option<PathBuf>,

    /// File that receives stdout.
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    /// Let the command write to the terminal directly.
    #[serde(default)]
    pub inherit_output: bool,
}
