// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{CommandSpec, ConfigFile, RawConfigFile};
use crate::config::validate::{Purpose, process_env, validate_config};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw document.
///
/// `.toml` files are parsed as TOML; everything else (`.yaml`, `.yml`, no
/// extension) as YAML. No semantic validation happens here; use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    let config: RawConfigFile = if is_toml {
        toml::from_str(&contents)?
    } else if contents.trim().is_empty() {
        RawConfigFile::default()
    } else {
        serde_yaml::from_str(&contents)?
    };

    Ok(config)
}

/// Load a configuration file from path and validate it for running a job.
///
/// Relative paths inside the file are resolved against the file's own
/// directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    load_with_overrides(Some(path.as_ref()), &ConfigOverrides::default(), Purpose::Job)
}

/// Values given on the command line. Each one that is set replaces the
/// corresponding config file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub work_dir: Option<PathBuf>,
    pub command: Vec<String>,
    pub log_dir: Option<PathBuf>,
    pub no_log: bool,
    pub notify: Option<String>,
    pub marker: Option<String>,
    pub interval: Option<u64>,
    pub tail_lines: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, raw: &mut RawConfigFile) {
        if let Some(dir) = &self.work_dir {
            raw.job.work_dir = Some(dir.to_string_lossy().into_owned());
        }
        if !self.command.is_empty() {
            raw.job.command = Some(CommandSpec::Tokens(self.command.clone()));
        }
        if let Some(dir) = &self.log_dir {
            raw.job.log.dir = Some(dir.to_string_lossy().into_owned());
        }
        if self.no_log {
            raw.job.log.save = false;
        }
        if let Some(kind) = &self.notify {
            raw.notification.kind = Some(kind.clone());
        }
        if let Some(marker) = &self.marker {
            raw.monitor.marker = Some(marker.clone());
        }
        if let Some(secs) = self.interval {
            raw.monitor.interval = Some(secs);
        }
        if let Some(n) = self.tail_lines {
            raw.monitor.tail_lines = Some(n);
        }
    }
}

/// Load (optionally) a config file, layer CLI overrides on top, and
/// validate the result for the given purpose.
///
/// Without a file, relative paths are resolved against the current
/// directory and every required value must come from `overrides`.
pub fn load_with_overrides(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
    purpose: Purpose,
) -> Result<ConfigFile> {
    let (mut raw, base_dir) = match path {
        Some(path) => (load_from_path(path)?, config_root_dir(path)),
        None => (RawConfigFile::default(), std::env::current_dir()?),
    };

    overrides.apply(&mut raw);
    validate_config(&raw, &base_dir, purpose, &process_env)
}

/// Directory that relative paths in a config file are anchored to.
///
/// A bare file name like `jobnotify.yaml` (parent = "") falls back to the
/// current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
