// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! A child exiting non-zero is not represented here: that is a fact stored
//! in `CompletionRecord::return_code`, not a failure of jobnotify itself.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobNotifyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to spawn `{command}`: {reason}")]
    SpawnError { command: String, reason: String },

    #[error("Notification delivery failed: {0}")]
    DeliveryError(String),

    #[error("Marker file {path:?} is not a complete record: {reason}")]
    MarkerParseError { path: PathBuf, reason: String },

    #[error("Unsupported notification channel: {0}")]
    UnsupportedChannel(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobNotifyError {
    /// True for the errors the Supervisor and Monitor degrade to local
    /// printing instead of aborting.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            JobNotifyError::DeliveryError(_) | JobNotifyError::ConfigError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, JobNotifyError>;
