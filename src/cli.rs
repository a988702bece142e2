// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `jobnotify`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobnotify",
    version,
    about = "Run a long job, capture its log, and get notified when it finishes.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBNOTIFY_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the job here and deliver the report directly when it exits.
    Run(RunArgs),

    /// Run the job and publish a completion marker for a separate monitor.
    Wrap(WrapArgs),

    /// Watch a work directory for a completion marker and deliver its report.
    Monitor(MonitorArgs),
}

/// Options shared by `run` and `wrap`: where the job comes from.
#[derive(Debug, Clone, Args)]
pub struct JobArgs {
    /// Path to the config file (YAML or TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Working directory for the job (overrides `job.work_dir`).
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Log file or directory (overrides `job.log.dir`).
    #[arg(long, value_name = "PATH")]
    pub log_dir: Option<PathBuf>,

    /// Do not persist the captured output to a log file.
    #[arg(long)]
    pub no_log: bool,

    /// Validate configuration and print the resolved job without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Command to run (overrides `job.command`). Put it after `--`.
    #[arg(last = true, value_name = "CMD")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Notification channel (overrides `notification.type`).
    #[arg(long, value_name = "TYPE")]
    pub notify: Option<String>,

    /// Sample the child's CPU/memory/GPU every SECS seconds and log a summary.
    #[arg(long, value_name = "SECS")]
    pub sample_interval: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct WrapArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Marker file name inside the work directory.
    #[arg(long, value_name = "NAME")]
    pub marker: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct MonitorArgs {
    /// Path to the config file (YAML or TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Work directory to watch (overrides `job.work_dir`).
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Marker file name inside the work directory.
    #[arg(long, value_name = "NAME")]
    pub marker: Option<String>,

    /// Seconds between checks in continuous mode.
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Check once and exit: 0 if a marker was handled, 1 if none was found.
    #[arg(long)]
    pub once: bool,

    /// Notification channel (overrides `notification.type`).
    #[arg(long, value_name = "TYPE")]
    pub notify: Option<String>,

    /// Number of log lines appended to the report (0 disables the tail).
    #[arg(long, value_name = "N")]
    pub tail_lines: Option<usize>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
