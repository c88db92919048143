// src/config/mod.rs

//! Pipeline file loading and validation for the `pipewright` binary.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a pipeline file from disk (`loader.rs`).
//! - Validate cross-field invariants like producer references (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{CommandConfig, PipelineFile, ProducerConfig, RawPipelineFile, SettingsSection};
