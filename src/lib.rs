// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod record;
pub mod report;
pub mod sampler;
pub mod signal;
pub mod supervisor;
pub mod types;

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, JobArgs, MonitorArgs, RunArgs, WrapArgs};
use crate::config::{ConfigFile, ConfigOverrides, Purpose, load_with_overrides};
use crate::errors::Result;
use crate::exec::command::normalize_argv;
use crate::exec::{CommandRunner, JobRequest};
use crate::fs::RealFileSystem;
use crate::monitor::{CheckOutcome, Monitor, MonitorExit};
use crate::notify::LocalPrintChannel;
use crate::signal::{marker_path, run_and_signal};
use crate::supervisor::Supervisor;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// Configuration is validated and the notification channel is built before
/// anything is spawned, so a bad config never costs a job run.
pub async fn run(args: CliArgs) -> Result<i32> {
    match args.command {
        Command::Run(args) => run_supervised(args).await,
        Command::Wrap(args) => run_wrapped(args).await,
        Command::Monitor(args) => run_monitor(args).await,
    }
}

/// Map a job's return code onto a process exit code.
pub fn exit_code_for(return_code: i32) -> i32 {
    if return_code < 0 { 1 } else { return_code }
}

fn job_overrides(job: &JobArgs) -> ConfigOverrides {
    ConfigOverrides {
        work_dir: job.work_dir.clone(),
        command: job.command.clone(),
        log_dir: job.log_dir.clone(),
        no_log: job.no_log,
        ..ConfigOverrides::default()
    }
}

async fn run_supervised(args: RunArgs) -> Result<i32> {
    let overrides = ConfigOverrides {
        notify: args.notify.clone(),
        ..job_overrides(&args.job)
    };
    let cfg = load_with_overrides(args.job.config.as_deref(), &overrides, Purpose::Job)?;

    if args.job.dry_run {
        print_dry_run(&cfg, None);
        return Ok(0);
    }

    let primary = notify::from_spec(&cfg.notification)?;
    let mut request = JobRequest::from_spec(&cfg.job);
    request.sample_interval = args
        .sample_interval
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    let supervisor = Supervisor::new(
        Box::new(CommandRunner::new()),
        primary,
        Box::new(LocalPrintChannel::stdout()),
    )
    .with_tail_lines(cfg.monitor.tail_lines);

    let run = supervisor.run(&request).await?;
    Ok(exit_code_for(run.return_code()))
}

async fn run_wrapped(args: WrapArgs) -> Result<i32> {
    let overrides = ConfigOverrides {
        marker: args.marker.clone(),
        ..job_overrides(&args.job)
    };
    let cfg = load_with_overrides(args.job.config.as_deref(), &overrides, Purpose::Job)?;

    if args.job.dry_run {
        print_dry_run(&cfg, Some(&cfg.monitor.marker));
        return Ok(0);
    }

    let request = JobRequest::from_spec(&cfg.job);
    let signalled = run_and_signal(
        &CommandRunner::new(),
        &RealFileSystem,
        &request,
        &cfg.monitor.marker,
    )
    .await?;

    let return_code = signalled.outcome.record.return_code();
    if signalled.marker.is_none() && return_code == 0 {
        // The job worked but nobody will hear about it.
        return Ok(1);
    }
    Ok(exit_code_for(return_code))
}

async fn run_monitor(args: MonitorArgs) -> Result<i32> {
    let overrides = ConfigOverrides {
        work_dir: args.work_dir.clone(),
        notify: args.notify.clone(),
        marker: args.marker.clone(),
        interval: args.interval,
        tail_lines: args.tail_lines,
        ..ConfigOverrides::default()
    };
    let cfg = load_with_overrides(args.config.as_deref(), &overrides, Purpose::Monitor)?;

    let primary = notify::from_spec(&cfg.notification)?;
    let monitor = Monitor::new(
        Box::new(RealFileSystem),
        primary,
        Box::new(LocalPrintChannel::stdout()),
        cfg.job.work_dir.clone(),
        cfg.monitor.clone(),
    );

    if args.once {
        let outcome = monitor.check_once().await;
        match &outcome {
            CheckOutcome::NotFound => {
                info!(marker = %monitor.marker_path().display(), "no completion marker found");
            }
            CheckOutcome::Waiting(reason) => {
                warn!(marker = %monitor.marker_path().display(), error = %reason, "marker present but not readable yet");
            }
            _ => {}
        }
        return Ok(outcome.exit_code());
    }

    // Ctrl-C → stop between ticks.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        let _ = shutdown_tx.send(());
    });

    match monitor.run_continuous(shutdown_rx).await {
        MonitorExit::Handled(delivery) => debug!(?delivery, "monitor finished"),
        MonitorExit::Interrupted => debug!("monitor stopped by interrupt"),
    }
    Ok(0)
}

/// Print the resolved job without running it.
fn print_dry_run(cfg: &ConfigFile, marker: Option<&str>) {
    let job = &cfg.job;
    println!("jobnotify dry-run");
    println!("  work_dir: {}", job.work_dir.display());
    println!("  command: {}", job.command_line());
    println!("  argv: {:?}", normalize_argv(&job.command));
    match &job.log_target {
        Some(target) => println!("  log: {}", target.display()),
        None => println!("  log: (not saved)"),
    }
    match marker {
        Some(name) => println!("  marker: {}", marker_path(&job.work_dir, name).display()),
        None => println!("  notification: {}", cfg.notification.kind),
    }

    debug!("dry-run complete (no execution)");
}
