// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk or a string (`loader.rs`).
//! - Validate value ranges (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, from_toml_str, load_and_validate, load_from_path};
pub use model::{ConfigFile, ExecutorConfig, LoggingSection, PermissionSection, RawConfigFile};
