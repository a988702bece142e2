// src/record.rs

//! The completion record: the one piece of state jobnotify produces.
//!
//! A record is built once, after the child has exited, and is never
//! mutated afterwards: `return_code` and the timing fields have no setters,
//! and `elapsed_seconds` is always derived from a [`RunClock`] or from the
//! start/end bounds, never supplied on its own.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wall-clock format used in records, markers, reports and log headers.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Exit code recorded when the child's status carries no code (killed by a
/// signal, for example).
pub const UNKNOWN_RETURN_CODE: i32 = -1;

/// Current local time truncated to whole seconds, matching [`TIME_FORMAT`].
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

pub fn format_time(t: &NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Process id of the supervising process, or `N/A` when the record was
/// read back from a marker in another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pid {
    Local(u32),
    #[default]
    NotAvailable,
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pid::Local(pid) => write!(f, "{pid}"),
            Pid::NotAvailable => f.write_str("N/A"),
        }
    }
}

impl Serialize for Pid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Pid::Local(pid) => serializer.serialize_u32(*pid),
            Pid::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(u32),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Num(pid) => Pid::Local(pid),
            Repr::Text(_) => Pid::NotAvailable,
        })
    }
}

/// Start/end bounds of one execution plus the derived duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunTiming {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    elapsed_seconds: f64,
}

impl RunTiming {
    /// Timing from wall-clock bounds alone. Returns `None` if `end` is
    /// before `start`.
    pub fn from_bounds(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        let delta = end.signed_duration_since(start);
        if delta < chrono::TimeDelta::zero() {
            return None;
        }
        Some(Self {
            start_time: start,
            end_time: end,
            elapsed_seconds: round_centis(delta.num_milliseconds() as f64 / 1000.0),
        })
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }
}

/// Captures both clocks immediately before spawn.
///
/// Wall-clock time is what humans read in the report; the monotonic
/// [`Instant`] is what the elapsed duration is computed from, so a clock
/// adjustment mid-run cannot yield a negative duration.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started_at: NaiveDateTime,
    started: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            started_at: now_local(),
            started: Instant::now(),
        }
    }

    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    /// Stop the clock at the exit-observation instant.
    pub fn finish(&self) -> RunTiming {
        let elapsed = self.started.elapsed();
        let end = now_local().max(self.started_at);
        RunTiming {
            start_time: self.started_at,
            end_time: end,
            elapsed_seconds: round_centis(elapsed.as_secs_f64()),
        }
    }
}

fn round_centis(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// Structured snapshot of one job's execution outcome and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    command: String,
    work_dir: PathBuf,
    #[serde(with = "local_time")]
    start_time: NaiveDateTime,
    #[serde(with = "local_time")]
    end_time: NaiveDateTime,
    elapsed_seconds: f64,
    return_code: i32,
    #[serde(default)]
    log_file: Option<PathBuf>,
    #[serde(default)]
    pid: Pid,
}

impl CompletionRecord {
    pub fn new(
        command: impl Into<String>,
        work_dir: impl Into<PathBuf>,
        timing: RunTiming,
        return_code: i32,
        pid: Pid,
    ) -> Self {
        Self {
            command: command.into(),
            work_dir: work_dir.into(),
            start_time: timing.start_time,
            end_time: timing.end_time,
            elapsed_seconds: timing.elapsed_seconds,
            return_code,
            log_file: None,
            pid,
        }
    }

    /// Attach the path the full output was persisted to.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Rebuild a record from persisted parts, checking the invariants a
    /// freshly measured record satisfies by construction.
    pub(crate) fn restore(
        command: String,
        work_dir: PathBuf,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        elapsed_seconds: f64,
        return_code: i32,
        log_file: Option<PathBuf>,
    ) -> Result<Self, String> {
        let record = Self {
            command,
            work_dir,
            start_time,
            end_time,
            elapsed_seconds,
            return_code,
            log_file,
            pid: Pid::NotAvailable,
        };
        record.check_invariants()?;
        Ok(record)
    }

    /// The same record as seen from a process that did not supervise it.
    pub fn observed_remotely(mut self) -> Self {
        self.pid = Pid::NotAvailable;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn return_code(&self) -> i32 {
        self.return_code
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn succeeded(&self) -> bool {
        self.return_code == 0
    }

    /// Check the invariants a record read from outside must satisfy.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.end_time < self.start_time {
            return Err(format!(
                "end_time {} is before start_time {}",
                format_time(&self.end_time),
                format_time(&self.start_time)
            ));
        }
        if !self.elapsed_seconds.is_finite() || self.elapsed_seconds < 0.0 {
            return Err(format!(
                "elapsed_seconds must be a non-negative number, got {}",
                self.elapsed_seconds
            ));
        }
        Ok(())
    }

    /// Field name / display value pairs, in report order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("command", self.command.clone()),
            ("pid", self.pid.to_string()),
            ("work_dir", self.work_dir.display().to_string()),
            ("start_time", format_time(&self.start_time)),
            ("end_time", format_time(&self.end_time)),
            ("elapsed_seconds", format!("{:.2}", self.elapsed_seconds)),
            ("return_code", self.return_code.to_string()),
            (
                "log_file",
                self.log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]
    }
}

/// Serde adapter for `YYYY-MM-DD HH:MM:SS` local timestamps.
pub mod local_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(t: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&t.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
