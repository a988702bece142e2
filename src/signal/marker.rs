// src/signal/marker.rs

//! The marker file: a completion record published for another process.
//!
//! Lifecycle: published once by the writer (atomically), read any number
//! of times by a monitor, removed once after the monitor has handled it.
//! There is no lock; the only safety property needed is that the file
//! becomes visible with its complete contents, which `publish` provides
//! through write-to-temp-then-rename.

use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{JobNotifyError, Result};
use crate::fs::FileSystem;
use crate::record::{CompletionRecord, local_time};

/// Marker name shared by convention between writer and monitor.
pub const DEFAULT_MARKER_NAME: &str = ".job_complete.json";

pub const STATUS_COMPLETED: &str = "completed";

/// On-disk JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerFile {
    pub status: String,
    #[serde(with = "local_time")]
    pub start_time: NaiveDateTime,
    #[serde(with = "local_time")]
    pub end_time: NaiveDateTime,
    pub elapsed_seconds: f64,
    pub return_code: i32,
    pub command: String,
    pub work_dir: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Epoch seconds at publication. Informational only.
    #[serde(default)]
    pub timestamp: f64,
}

impl From<&CompletionRecord> for MarkerFile {
    fn from(record: &CompletionRecord) -> Self {
        Self {
            status: STATUS_COMPLETED.to_string(),
            start_time: record.start_time(),
            end_time: record.end_time(),
            elapsed_seconds: record.elapsed_seconds(),
            return_code: record.return_code(),
            command: record.command().to_string(),
            work_dir: record.work_dir().to_path_buf(),
            log_file: record.log_file().map(Path::to_path_buf),
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }
}

impl MarkerFile {
    /// The record this marker describes, as seen by a different process
    /// (`pid` is `N/A`).
    pub fn into_record(self) -> std::result::Result<CompletionRecord, String> {
        if self.status != STATUS_COMPLETED {
            return Err(format!("unexpected status {:?}", self.status));
        }
        CompletionRecord::restore(
            self.command,
            self.work_dir,
            self.start_time,
            self.end_time,
            self.elapsed_seconds,
            self.return_code,
            self.log_file,
        )
    }
}

pub fn marker_path(work_dir: &Path, marker_name: &str) -> PathBuf {
    work_dir.join(marker_name)
}

/// Serialise `record` and publish it at `<work_dir>/<marker_name>`.
pub fn write_marker(
    fs: &dyn FileSystem,
    work_dir: &Path,
    marker_name: &str,
    record: &CompletionRecord,
) -> Result<PathBuf> {
    let path = marker_path(work_dir, marker_name);
    let json = serde_json::to_vec_pretty(&MarkerFile::from(record))?;
    fs.publish(&path, &json)?;
    info!(marker = %path.display(), "completion marker published");
    Ok(path)
}

/// Result of looking at the marker location once.
#[derive(Debug)]
pub enum MarkerProbe {
    /// Nothing there yet.
    Absent,
    /// Something is there but it is not a complete record (yet). Carries a
    /// `MarkerParseError`.
    Incomplete(JobNotifyError),
    Ready(CompletionRecord),
}

/// Look for a marker at `path`. Never fails: every problem maps to
/// `Absent` or `Incomplete`, both of which mean "keep waiting".
pub fn probe_marker(fs: &dyn FileSystem, path: &Path) -> MarkerProbe {
    if !fs.is_file(path) {
        return MarkerProbe::Absent;
    }

    let parse_error = |reason: String| {
        MarkerProbe::Incomplete(JobNotifyError::MarkerParseError {
            path: path.to_path_buf(),
            reason,
        })
    };

    let contents = match fs.read_to_string(path) {
        Ok(c) => c,
        // Removed between the existence check and the read.
        Err(_) if !fs.exists(path) => return MarkerProbe::Absent,
        Err(e) => return parse_error(format!("{e:#}")),
    };

    let marker: MarkerFile = match serde_json::from_str(&contents) {
        Ok(m) => m,
        Err(e) => return parse_error(e.to_string()),
    };

    match marker.into_record() {
        Ok(record) => MarkerProbe::Ready(record),
        Err(reason) => parse_error(reason),
    }
}

/// Delete a handled marker. Failure is logged, not returned: the marker is
/// advisory, and a leftover only causes a duplicate notification later.
pub fn remove_marker(fs: &dyn FileSystem, path: &Path) -> bool {
    match fs.remove_file(path) {
        Ok(()) => {
            debug!(marker = %path.display(), "marker removed");
            true
        }
        Err(e) => {
            warn!(marker = %path.display(), error = %format!("{e:#}"), "failed to remove marker");
            false
        }
    }
}
