// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};

use crate::config::model::{
    ConfigFile, DEFAULT_LOG_DIR, JobSpec, MonitorSettings, NotificationSpec, RawConfigFile,
};
use crate::errors::{JobNotifyError, Result};
use crate::notify::push;
use crate::types::ChannelKind;

/// What the configuration is going to drive. A monitor never spawns the
/// job, so it does not need a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Job,
    Monitor,
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = JobNotifyError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let base_dir = std::env::current_dir()?;
        validate_config(&raw, &base_dir, Purpose::Job, &process_env)
    }
}

/// Environment lookup backed by the real process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Check a raw document and produce the resolved [`ConfigFile`].
///
/// - `base_dir` anchors a relative `job.work_dir` (normally the config
///   file's directory).
/// - `env` is consulted for `$VAR` expansion and for the remote-push
///   credential fallback.
///
/// Runs before any process is spawned.
pub fn validate_config(
    raw: &RawConfigFile,
    base_dir: &Path,
    purpose: Purpose,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<ConfigFile> {
    let work_dir = resolve_work_dir(raw, base_dir, env)?;
    let command = resolve_command(raw, purpose)?;
    let log_target = resolve_log_target(raw, &work_dir);
    let notification = validate_notification(raw, env)?;
    let monitor = validate_monitor(raw)?;

    Ok(ConfigFile::new_unchecked(
        JobSpec {
            work_dir,
            command,
            log_target,
        },
        notification,
        monitor,
    ))
}

fn resolve_work_dir(
    raw: &RawConfigFile,
    base_dir: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<PathBuf> {
    let configured = raw
        .job
        .work_dir
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            JobNotifyError::ConfigError("missing required `job.work_dir`".to_string())
        })?;

    let expanded = PathBuf::from(expand_env_vars(configured, env));
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    };

    if !joined.is_dir() {
        return Err(JobNotifyError::ConfigError(format!(
            "work directory does not exist: {}",
            joined.display()
        )));
    }

    joined.canonicalize().map_err(|e| {
        JobNotifyError::ConfigError(format!(
            "cannot resolve work directory {}: {e}",
            joined.display()
        ))
    })
}

fn resolve_command(raw: &RawConfigFile, purpose: Purpose) -> Result<Vec<String>> {
    let tokens = raw
        .job
        .command
        .as_ref()
        .map(|c| c.tokens())
        .unwrap_or_default();

    if tokens.is_empty() && purpose == Purpose::Job {
        return Err(JobNotifyError::ConfigError(
            "missing required `job.command`".to_string(),
        ));
    }
    Ok(tokens)
}

fn resolve_log_target(raw: &RawConfigFile, work_dir: &Path) -> Option<PathBuf> {
    if !raw.job.log.save {
        return None;
    }
    let dir = raw
        .job
        .log
        .dir
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LOG_DIR);
    Some(work_dir.join(dir))
}

fn validate_notification(
    raw: &RawConfigFile,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<NotificationSpec> {
    let kind = match raw.notification.kind.as_deref() {
        None => ChannelKind::default(),
        Some(name) => name
            .parse::<ChannelKind>()
            .map_err(JobNotifyError::UnsupportedChannel)?,
    };

    if kind == ChannelKind::RemotePush {
        // Surface a missing credential now, not after a multi-hour job.
        push::resolve_api_key(&raw.notification.remote_push, env)?;
        if raw.notification.remote_push.timeout == Some(0) {
            return Err(JobNotifyError::ConfigError(
                "`notification.remote_push.timeout` must be >= 1 second".to_string(),
            ));
        }
    }

    Ok(NotificationSpec {
        kind,
        remote_push: raw.notification.remote_push.clone(),
    })
}

fn validate_monitor(raw: &RawConfigFile) -> Result<MonitorSettings> {
    let defaults = MonitorSettings::default();
    let section = &raw.monitor;

    let marker = match section.marker.as_deref().map(str::trim) {
        None => defaults.marker,
        Some(name) if is_plain_file_name(name) => name.to_string(),
        Some(name) => {
            return Err(JobNotifyError::ConfigError(format!(
                "`monitor.marker` must be a plain file name, got {name:?}"
            )));
        }
    };

    let interval = match section.interval {
        None => defaults.interval,
        Some(0) => {
            return Err(JobNotifyError::ConfigError(
                "`monitor.interval` must be >= 1 second".to_string(),
            ));
        }
        Some(secs) => Duration::from_secs(secs),
    };

    Ok(MonitorSettings {
        marker,
        interval,
        tail_lines: section.tail_lines.unwrap_or(defaults.tail_lines),
    })
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("env var pattern is valid")
});

/// Expand `$VAR` and `${VAR}`. Unknown variables are left untouched.
pub fn expand_env_vars(input: &str, env: &dyn Fn(&str) -> Option<String>) -> String {
    ENV_VAR
        .replace_all(input, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            env(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
