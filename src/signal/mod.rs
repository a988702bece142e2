// src/signal/mod.rs

//! CompletionSignal: run a job and, instead of notifying directly, publish
//! its completion record as a marker file in the work directory. A monitor
//! process (possibly on another host sharing the filesystem) picks it up.

pub mod marker;

use std::path::PathBuf;

use tracing::{error, warn};

use crate::errors::Result;
use crate::exec::{JobOutcome, JobRequest, JobRunner};
use crate::fs::FileSystem;

pub use marker::{
    DEFAULT_MARKER_NAME, MarkerFile, MarkerProbe, marker_path, probe_marker, remove_marker,
    write_marker,
};

/// A finished job plus where its marker went.
#[derive(Debug)]
pub struct SignalledRun {
    pub outcome: JobOutcome,
    /// `None` if publishing the marker failed (already logged).
    pub marker: Option<PathBuf>,
}

/// Run `request` and publish the completion marker.
///
/// Spawn failures are returned before anything is written. A marker left
/// over from an earlier, unconsumed run is reported but not touched: the
/// monitor still owes someone that notification.
pub async fn run_and_signal(
    runner: &dyn JobRunner,
    fs: &dyn FileSystem,
    request: &JobRequest,
    marker_name: &str,
) -> Result<SignalledRun> {
    let path = marker_path(&request.work_dir, marker_name);
    if fs.exists(&path) {
        warn!(
            marker = %path.display(),
            "a previous completion marker has not been consumed yet; it will be replaced when this job ends"
        );
    }

    let outcome = runner.execute(request).await?;

    let marker = match write_marker(fs, &request.work_dir, marker_name, &outcome.record) {
        Ok(path) => Some(path),
        Err(e) => {
            error!(marker = %path.display(), error = %e, "failed to publish completion marker");
            None
        }
    };

    Ok(SignalledRun { outcome, marker })
}
