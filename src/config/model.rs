// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::ChannelKind;

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TAIL_LINES: usize = 50;

/// Top-level configuration document as read from YAML or TOML.
///
/// ```yaml
/// job:
///   work_dir: ./runs/exp1
///   command: python train.py --epochs 10
///   log:
///     dir: logs
///     save: true
/// notification:
///   type: remote-push
///   remote_push:
///     api_key: "..."
///     timeout: 8
/// monitor:
///   marker: .job_complete.json
///   interval: 60
///   tail_lines: 50
/// ```
///
/// Every field is optional at this stage; [`ConfigFile`] is the checked
/// form the rest of the crate works with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default, alias = "train")]
    pub job: JobSection,

    #[serde(default)]
    pub notification: NotificationSection,

    #[serde(default)]
    pub monitor: MonitorSection,
}

/// `job:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSection {
    /// Directory the command runs in. `$VAR` / `${VAR}` are expanded, and a
    /// relative path is resolved against the config file's directory.
    #[serde(default)]
    pub work_dir: Option<String>,

    #[serde(default)]
    pub command: Option<CommandSpec>,

    #[serde(default)]
    pub log: LogSection,
}

/// A command given either as one line or as a token list. Neither form
/// goes through a shell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Tokens(Vec<String>),
}

impl CommandSpec {
    pub fn tokens(&self) -> Vec<String> {
        match self {
            CommandSpec::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandSpec::Tokens(tokens) => tokens
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

/// `job.log:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSection {
    /// File path (has an extension) or directory (no extension), relative
    /// to the work directory.
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default = "default_true")]
    pub save: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            dir: None,
            save: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `notification:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationSection {
    /// Channel name. Kept as a string here so an unknown name surfaces as
    /// `UnsupportedChannel` from validation instead of a parse error.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default, alias = "xxtui", alias = "remote-push")]
    pub remote_push: RemotePushParams,
}

/// Parameters for the remote-push channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemotePushParams {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Base URL override; the key is appended as the last path segment.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// `monitor:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorSection {
    #[serde(default)]
    pub marker: Option<String>,

    /// Poll interval in seconds.
    #[serde(default)]
    pub interval: Option<u64>,

    #[serde(default)]
    pub tail_lines: Option<usize>,
}

/// Validated configuration.
///
/// Only constructed through validation (see `validate.rs`), so holders can
/// rely on `work_dir` existing and on the notification settings being
/// usable.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub job: JobSpec,
    pub notification: NotificationSpec,
    pub monitor: MonitorSettings,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        job: JobSpec,
        notification: NotificationSpec,
        monitor: MonitorSettings,
    ) -> Self {
        Self {
            job,
            notification,
            monitor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Absolute, existing directory.
    pub work_dir: PathBuf,

    /// Argv tokens. Empty only when validated for monitoring.
    pub command: Vec<String>,

    /// Where to persist the log, if saving is enabled.
    pub log_target: Option<PathBuf>,
}

impl JobSpec {
    /// The command as one display line.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSpec {
    pub kind: ChannelKind,
    pub remote_push: RemotePushParams,
}

impl NotificationSpec {
    pub fn local_print() -> Self {
        Self {
            kind: ChannelKind::LocalPrint,
            remote_push: RemotePushParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub marker: String,
    pub interval: Duration,
    pub tail_lines: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            marker: crate::signal::DEFAULT_MARKER_NAME.to_string(),
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }
}
