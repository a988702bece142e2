// src/logging.rs

//! Diagnostics for the `run`, `wrap` and `monitor` processes.
//!
//! A monitor left polling for hours should stay quiet at `info`, so the
//! level is resolved from `--log-level`, then `JOBNOTIFY_LOG`, then `info`.
//!
//! Diagnostics go to stderr. Stdout belongs to the job: its echoed output
//! and locally printed reports share it with nothing else.
//!
//! `main` calls [`init_logging`] once, after argument parsing and before
//! anything is spawned. Library code never installs a subscriber.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "JOBNOTIFY_LOG";

/// Install the global subscriber, reading `JOBNOTIFY_LOG` from the process
/// environment when no flag was given.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = resolve_level(cli_level, &|key| std::env::var(key).ok());

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

/// The effective level. An unparsable `JOBNOTIFY_LOG` falls back to `info`
/// rather than failing startup.
pub fn resolve_level(cli_level: Option<LogLevel>, env: &dyn Fn(&str) -> Option<String>) -> Level {
    if let Some(lvl) = cli_level {
        return match lvl {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        };
    }
    env(LOG_ENV)
        .and_then(|s| parse_level_str(&s))
        .unwrap_or(Level::INFO)
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
