// src/exec/runner.rs

//! CommandRunner: spawn one child, stream its merged output, wait for it,
//! and produce the [`CompletionRecord`].
//!
//! stdout and stderr share one OS pipe, so lines keep the order the child
//! wrote them in. A dedicated reader thread drains that pipe while the main
//! flow awaits the exit status; without it a chatty child would block on a
//! full pipe buffer and never exit.

use std::io::{BufRead, BufReader, PipeReader};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::JobSpec;
use crate::errors::{JobNotifyError, Result};
use crate::exec::command::{normalize_argv, split_command_line};
use crate::exec::log_sink::OutputLog;
use crate::record::{CompletionRecord, Pid, RunClock, UNKNOWN_RETURN_CODE};
use crate::sampler::{ResourceMetrics, ResourceSampler};

/// How long to keep draining output after the child exits. A background
/// grandchild can hold the pipe open indefinitely; the record must not wait
/// for it.
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Everything needed to run one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub command: Vec<String>,
    pub work_dir: PathBuf,
    pub log_target: Option<PathBuf>,
    /// Mirror child output to our stdout.
    pub echo: bool,
    pub sample_interval: Option<Duration>,
}

impl JobRequest {
    pub fn new(command_line: &str, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: split_command_line(command_line),
            work_dir: work_dir.into(),
            log_target: None,
            echo: true,
            sample_interval: None,
        }
    }

    pub fn from_spec(spec: &JobSpec) -> Self {
        Self {
            command: spec.command.clone(),
            work_dir: spec.work_dir.clone(),
            log_target: spec.log_target.clone(),
            echo: true,
            sample_interval: None,
        }
    }

    pub fn with_log_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.log_target = Some(target.into());
        self
    }

    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// A finished run: the record plus the most recent output lines.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub record: CompletionRecord,
    pub output_tail: Vec<String>,
    pub total_lines: usize,
}

impl JobOutcome {
    /// The last `n` captured lines.
    pub fn tail(&self, n: usize) -> &[String] {
        let skip = self.output_tail.len().saturating_sub(n);
        &self.output_tail[skip..]
    }
}

fn lock(log: &Mutex<OutputLog>) -> MutexGuard<'_, OutputLog> {
    log.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run `request` to completion.
///
/// Fails with `SpawnError` when the child cannot be created. A child that
/// runs and exits non-zero is a successful run with that `return_code`.
pub async fn run_job(request: &JobRequest) -> Result<JobOutcome> {
    let command_line = request.command_line();
    let spawn_error = |reason: String| JobNotifyError::SpawnError {
        command: command_line.clone(),
        reason,
    };

    if request.command.is_empty() {
        return Err(spawn_error("empty command".to_string()));
    }
    if !request.work_dir.is_dir() {
        return Err(spawn_error(format!(
            "work directory does not exist: {}",
            request.work_dir.display()
        )));
    }

    let argv = normalize_argv(&request.command);
    let (pipe_reader, pipe_writer) = std::io::pipe()?;
    let stderr_writer = pipe_writer.try_clone()?;

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .current_dir(&request.work_dir)
        .stdout(pipe_writer)
        .stderr(stderr_writer)
        .kill_on_drop(true);

    let clock = RunClock::start();
    let spawned = cmd.spawn();
    // The Command still owns our copies of the write end; the reader only
    // sees EOF once they are closed.
    drop(cmd);
    let mut child = spawned.map_err(|e| spawn_error(e.to_string()))?;

    // Opened only once the child exists so a failed spawn leaves no log.
    // Nothing is read from the pipe before the reader starts below.
    let output = match &request.log_target {
        Some(target) => OutputLog::create(
            target,
            clock.started_at(),
            &command_line,
            &request.work_dir,
            request.echo,
        )
        .unwrap_or_else(|e| {
            warn!(target = %target.display(), error = %e, "cannot open log file; output kept in memory only");
            OutputLog::in_memory(request.echo)
        }),
        None => OutputLog::in_memory(request.echo),
    };
    let output = Arc::new(Mutex::new(output));

    let child_pid = child.id();
    info!(
        pid = child_pid,
        cmd = %argv.join(" "),
        work_dir = %request.work_dir.display(),
        "job started"
    );

    let drained = spawn_output_reader(pipe_reader, Arc::clone(&output))?;
    let sampling = match (request.sample_interval, child_pid) {
        (Some(interval), Some(pid)) => start_sampling(pid, interval),
        _ => None,
    };

    let status = child.wait().await?;
    let timing = clock.finish();
    let return_code = status.code().unwrap_or(UNKNOWN_RETURN_CODE);

    info!(
        exit_code = return_code,
        success = status.success(),
        elapsed_seconds = timing.elapsed_seconds(),
        "job exited"
    );

    if tokio::time::timeout(DRAIN_GRACE, drained).await.is_err() {
        warn!("output pipe still open after exit (background process?); finalising without it");
    }

    if let Some(sampling) = sampling {
        sampling.stop().await;
    }

    let pid = child_pid.map(Pid::Local).unwrap_or(Pid::NotAvailable);
    let mut record = CompletionRecord::new(
        command_line.clone(),
        request.work_dir.clone(),
        timing,
        return_code,
        pid,
    );

    let mut output = lock(&output);
    if let Some(path) = output.log_path() {
        record = record.with_log_file(path);
    }
    if let Some(path) = output.finish(&record) {
        info!(log_file = %path.display(), "job log saved");
    }

    Ok(JobOutcome {
        output_tail: output.tail(crate::exec::log_sink::MEMORY_WINDOW),
        total_lines: output.total_lines(),
        record,
    })
}

/// Start the line reader. The returned receiver resolves at EOF.
fn spawn_output_reader(
    pipe: PipeReader,
    output: Arc<Mutex<OutputLog>>,
) -> Result<oneshot::Receiver<()>> {
    let (done_tx, done_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("jobnotify-output".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(pipe);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\n', '\r']);
                        lock(&output).push_line(line);
                    }
                    Err(e) => {
                        debug!(error = %e, "output pipe read failed");
                        break;
                    }
                }
            }
            let _ = done_tx.send(());
        })?;

    Ok(done_rx)
}

/// Background resource sampling for the child's lifetime.
struct Sampling {
    stop: std::sync::mpsc::Sender<()>,
    metrics: oneshot::Receiver<ResourceMetrics>,
}

impl Sampling {
    async fn stop(self) {
        let _ = self.stop.send(());
        match tokio::time::timeout(Duration::from_secs(5), self.metrics).await {
            Ok(Ok(metrics)) if metrics.sample_count() > 0 => {
                info!(
                    samples = metrics.sample_count(),
                    avg_cpu_percent = metrics.avg_cpu(),
                    max_memory_mb = metrics.max_memory_mb(),
                    avg_gpu_percent = ?metrics.avg_gpu(),
                    "resource usage summary"
                );
            }
            _ => debug!("no resource samples collected"),
        }
    }
}

fn start_sampling(pid: u32, interval: Duration) -> Option<Sampling> {
    let mut sampler = match ResourceSampler::new(pid) {
        Ok(s) => s,
        Err(e) => {
            debug!(pid, error = %e, "resource sampling unavailable");
            return None;
        }
    };

    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
    let (metrics_tx, metrics_rx) = oneshot::channel();

    let spawned = std::thread::Builder::new()
        .name("jobnotify-sampler".to_string())
        .spawn(move || {
            while let Err(std::sync::mpsc::RecvTimeoutError::Timeout) =
                stop_rx.recv_timeout(interval)
            {
                let sample = sampler.sample_all();
                debug!(
                    pid,
                    cpu_percent = sample.cpu_percent,
                    memory_mb = sample.memory_mb,
                    gpu_percent = ?sample.gpu_percent,
                    "resource sample"
                );
            }
            let _ = metrics_tx.send(sampler.into_metrics());
        });

    match spawned {
        Ok(_) => Some(Sampling {
            stop: stop_tx,
            metrics: metrics_rx,
        }),
        Err(e) => {
            warn!(error = %e, "failed to start resource sampler thread");
            None
        }
    }
}
