// src/monitor/mod.rs

//! Monitor: discover a completion marker by polling, notify, clean up.
//!
//! The monitor shares nothing with the writer except the filesystem. It may
//! start before the job, after it, or long after the writer has died; all
//! it ever looks at is whether `<work_dir>/<marker>` holds a complete
//! record.
//!
//! Delivery is at-least-once. The marker is removed only after the report
//! reached someone (the primary channel or the local fallback); a crash in
//! between means the next monitor run reports the same job again.

pub mod tail;
pub mod wait_log;

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::MonitorSettings;
use crate::fs::FileSystem;
use crate::notify::{Channel, DeliveryOutcome, deliver_with_fallback};
use crate::report;
use crate::signal::{MarkerProbe, marker_path, probe_marker, remove_marker};

pub use tail::read_tail;
pub use wait_log::WaitLog;

/// Result of one poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No marker yet.
    NotFound,
    /// A marker exists but could not be parsed; treated as not yet complete.
    Waiting(String),
    /// The report reached someone.
    Handled {
        delivery: DeliveryOutcome,
        marker_removed: bool,
    },
    /// Neither channel accepted the report. The marker stays for a retry.
    Undelivered(String),
}

impl CheckOutcome {
    /// Process exit code for single-shot mode.
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckOutcome::Handled { .. } => 0,
            _ => 1,
        }
    }
}

/// How a continuous run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    Handled(DeliveryOutcome),
    Interrupted,
}

pub struct Monitor {
    fs: Box<dyn FileSystem>,
    primary: Box<dyn Channel>,
    fallback: Box<dyn Channel>,
    work_dir: PathBuf,
    settings: MonitorSettings,
}

impl Monitor {
    pub fn new(
        fs: Box<dyn FileSystem>,
        primary: Box<dyn Channel>,
        fallback: Box<dyn Channel>,
        work_dir: impl Into<PathBuf>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            fs,
            primary,
            fallback,
            work_dir: work_dir.into(),
            settings,
        }
    }

    pub fn marker_path(&self) -> PathBuf {
        marker_path(&self.work_dir, &self.settings.marker)
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Look once; if a complete marker is there, report it and remove it.
    pub async fn check_once(&self) -> CheckOutcome {
        let path = self.marker_path();
        let record = match probe_marker(self.fs.as_ref(), &path) {
            MarkerProbe::Absent => return CheckOutcome::NotFound,
            MarkerProbe::Incomplete(err) => {
                debug!(error = %err, "marker present but not readable yet");
                return CheckOutcome::Waiting(err.to_string());
            }
            MarkerProbe::Ready(record) => record,
        };

        info!(
            marker = %path.display(),
            exit_code = record.return_code(),
            elapsed_seconds = record.elapsed_seconds(),
            "completion marker found"
        );

        let tail = match record.log_file() {
            Some(log) if self.settings.tail_lines > 0 => self.log_tail(log),
            _ => Vec::new(),
        };
        let message = report::markdown_with_tail(&record, &tail);

        let delivery =
            deliver_with_fallback(self.primary.as_ref(), self.fallback.as_ref(), &message).await;

        if let DeliveryOutcome::Lost { reason } = &delivery {
            error!(marker = %path.display(), "report not delivered anywhere; keeping marker");
            return CheckOutcome::Undelivered(reason.clone());
        }

        let marker_removed = remove_marker(self.fs.as_ref(), &path);
        CheckOutcome::Handled {
            delivery,
            marker_removed,
        }
    }

    fn log_tail(&self, log: &Path) -> Vec<String> {
        let path = if log.is_absolute() {
            log.to_path_buf()
        } else {
            self.work_dir.join(log)
        };
        match read_tail(self.fs.as_ref(), &path, self.settings.tail_lines) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(log_file = %path.display(), error = %format!("{e:#}"), "cannot read log tail; sending report without it");
                Vec::new()
            }
        }
    }

    /// Poll until a marker is handled or `shutdown` fires.
    ///
    /// Interruption is only observed between ticks; a delivery in progress
    /// runs to completion (it is bounded by the channel timeout).
    pub async fn run_continuous(&self, mut shutdown: oneshot::Receiver<()>) -> MonitorExit {
        let interval = self.settings.interval;
        info!(
            work_dir = %self.work_dir.display(),
            marker = %self.settings.marker,
            interval_secs = interval.as_secs(),
            "monitor started"
        );

        let mut waiting = WaitLog::new(interval);
        let mut unreadable = WaitLog::new(interval);
        let mut checks: u64 = 0;
        let mut shutdown_live = true;

        loop {
            checks += 1;
            match self.check_once().await {
                CheckOutcome::Handled { delivery, .. } => {
                    info!(checks, "job report handled; monitor exiting");
                    return MonitorExit::Handled(delivery);
                }
                CheckOutcome::NotFound => {
                    if waiting.should_log(Instant::now()) {
                        info!(checks, marker = %self.marker_path().display(), "still waiting for job completion");
                    } else {
                        debug!(checks, "marker not found");
                    }
                }
                CheckOutcome::Waiting(reason) => {
                    if unreadable.should_log(Instant::now()) {
                        warn!(checks, error = %reason, "marker present but not readable yet; will retry");
                    }
                }
                CheckOutcome::Undelivered(_) => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                res = &mut shutdown, if shutdown_live => {
                    match res {
                        Ok(()) => {
                            info!(checks, "monitor interrupted; stopping");
                            return MonitorExit::Interrupted;
                        }
                        Err(e) => {
                            debug!(error = %e, "shutdown channel closed without a signal");
                            shutdown_live = false;
                        }
                    }
                }
            }
        }
    }
}
