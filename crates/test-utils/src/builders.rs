#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use jobnotify::config::{CommandSpec, RawConfigFile};
use jobnotify::record::{CompletionRecord, Pid, RunTiming};
use jobnotify::signal::MarkerFile;

/// Builder for `RawConfigFile` to simplify test setup.
#[derive(Debug, Clone, Default)]
pub struct RawConfigBuilder {
    raw: RawConfigFile,
}

impl RawConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.raw.job.work_dir = Some(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn command(mut self, line: &str) -> Self {
        self.raw.job.command = Some(CommandSpec::Line(line.to_string()));
        self
    }

    pub fn command_tokens(mut self, tokens: &[&str]) -> Self {
        self.raw.job.command = Some(CommandSpec::Tokens(
            tokens.iter().map(|t| t.to_string()).collect(),
        ));
        self
    }

    pub fn log_dir(mut self, dir: &str) -> Self {
        self.raw.job.log.dir = Some(dir.to_string());
        self
    }

    pub fn no_log(mut self) -> Self {
        self.raw.job.log.save = false;
        self
    }

    pub fn notify(mut self, kind: &str) -> Self {
        self.raw.notification.kind = Some(kind.to_string());
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.raw.notification.remote_push.api_key = Some(key.to_string());
        self
    }

    pub fn push_timeout(mut self, secs: u64) -> Self {
        self.raw.notification.remote_push.timeout = Some(secs);
        self
    }

    pub fn marker(mut self, name: &str) -> Self {
        self.raw.monitor.marker = Some(name.to_string());
        self
    }

    pub fn interval(mut self, secs: u64) -> Self {
        self.raw.monitor.interval = Some(secs);
        self
    }

    pub fn tail_lines(mut self, n: usize) -> Self {
        self.raw.monitor.tail_lines = Some(n);
        self
    }

    pub fn build(self) -> RawConfigFile {
        self.raw
    }
}

/// Builder for `CompletionRecord` with fixed, readable timestamps.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    command: String,
    work_dir: PathBuf,
    start: NaiveDateTime,
    elapsed_secs: i64,
    return_code: i32,
    log_file: Option<PathBuf>,
    pid: Pid,
}

impl RecordBuilder {
    pub fn new(command: &str, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.to_string(),
            work_dir: work_dir.into(),
            start: default_start(),
            elapsed_secs: 42,
            return_code: 0,
            log_file: None,
            pid: Pid::Local(4242),
        }
    }

    pub fn start(mut self, start: NaiveDateTime) -> Self {
        self.start = start;
        self
    }

    pub fn elapsed_secs(mut self, secs: i64) -> Self {
        self.elapsed_secs = secs;
        self
    }

    pub fn return_code(mut self, code: i32) -> Self {
        self.return_code = code;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn pid(mut self, pid: Pid) -> Self {
        self.pid = pid;
        self
    }

    pub fn build(self) -> CompletionRecord {
        let end = self.start + TimeDelta::seconds(self.elapsed_secs);
        let timing =
            RunTiming::from_bounds(self.start, end).expect("RecordBuilder needs elapsed >= 0");
        let record = CompletionRecord::new(
            self.command,
            self.work_dir,
            timing,
            self.return_code,
            self.pid,
        );
        match self.log_file {
            Some(path) => record.with_log_file(path),
            None => record,
        }
    }
}

/// 2024-03-01 12:00:00, the start time every built record uses by default.
pub fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid fixed date")
}

/// The marker JSON a writer would publish for `record`.
pub fn marker_json(record: &CompletionRecord) -> String {
    serde_json::to_string_pretty(&MarkerFile::from(record)).expect("marker serialises")
}
