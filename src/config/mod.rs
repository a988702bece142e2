// src/config/mod.rs

//! Configuration loading and validation for jobnotify.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load a YAML or TOML file from disk and layer CLI overrides (`loader.rs`).
//! - Validate and resolve it before anything is spawned (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{ConfigOverrides, load_and_validate, load_from_path, load_with_overrides};
pub use model::{
    CommandSpec, ConfigFile, JobSection, JobSpec, LogSection, MonitorSection, MonitorSettings,
    NotificationSection, NotificationSpec, RawConfigFile, RemotePushParams,
};
pub use validate::{Purpose, validate_config};
