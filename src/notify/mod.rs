// src/notify/mod.rs

//! Notification channels.
//!
//! A channel has one capability: deliver a Markdown report. Which variant is
//! used is an explicit [`ChannelKind`] tag, resolved once by [`build_channel`]
//! before any job starts.
//!
//! Delivery is attempted exactly once per call; deciding what to do on
//! failure is the caller's job. [`deliver_with_fallback`] implements the
//! policy both the Supervisor and the Monitor use: try the primary channel,
//! and if that fails print the report locally instead.

pub mod local;
pub mod push;

use std::future::Future;
use std::pin::Pin;

use tracing::{error, info, warn};

use crate::config::{NotificationSpec, RemotePushParams};
use crate::config::validate::process_env;
use crate::errors::{JobNotifyError, Result};
use crate::types::ChannelKind;

pub use local::LocalPrintChannel;
pub use push::RemotePushChannel;

pub type DeliverFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A notification backend.
pub trait Channel: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Deliver `markdown` once. Failures are `DeliveryError`.
    fn deliver<'a>(&'a self, markdown: &'a str) -> DeliverFuture<'a>;
}

/// Build a channel by name, e.g. `"local-print"` or `"remote-push"`.
///
/// Unknown names fail with `UnsupportedChannel`; a remote-push channel
/// without a credential fails with `ConfigError`.
pub fn build_channel(name: &str, params: &RemotePushParams) -> Result<Box<dyn Channel>> {
    build_channel_with_env(name, params, &process_env)
}

/// [`build_channel`] with an explicit environment lookup.
pub fn build_channel_with_env(
    name: &str,
    params: &RemotePushParams,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Box<dyn Channel>> {
    let kind = name
        .parse::<ChannelKind>()
        .map_err(JobNotifyError::UnsupportedChannel)?;
    build_kind(kind, params, env)
}

/// Build the channel a validated configuration asks for.
pub fn from_spec(spec: &NotificationSpec) -> Result<Box<dyn Channel>> {
    build_kind(spec.kind, &spec.remote_push, &process_env)
}

fn build_kind(
    kind: ChannelKind,
    params: &RemotePushParams,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Box<dyn Channel>> {
    Ok(match kind {
        ChannelKind::LocalPrint => Box::new(LocalPrintChannel::stdout()),
        ChannelKind::RemotePush => Box::new(RemotePushChannel::from_params(params, env)?),
    })
}

/// What happened to a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The primary channel accepted it.
    Delivered,
    /// The primary channel failed; the report went to the fallback.
    FellBack { reason: String },
    /// Both failed. The report was not shown anywhere.
    Lost { reason: String },
}

impl DeliveryOutcome {
    pub fn reached_someone(&self) -> bool {
        !matches!(self, DeliveryOutcome::Lost { .. })
    }
}

/// Deliver through `primary`; on failure hand the same report to
/// `fallback`. Never returns an error: notification trouble is logged and
/// reported in the outcome, it never aborts the caller.
pub async fn deliver_with_fallback(
    primary: &dyn Channel,
    fallback: &dyn Channel,
    report: &str,
) -> DeliveryOutcome {
    match primary.deliver(report).await {
        Ok(()) => {
            info!(channel = primary.name(), "notification delivered");
            DeliveryOutcome::Delivered
        }
        Err(err) => {
            warn!(
                channel = primary.name(),
                error = %err,
                "notification failed; printing report locally"
            );
            let reason = err.to_string();
            match fallback.deliver(report).await {
                Ok(()) => DeliveryOutcome::FellBack { reason },
                Err(fallback_err) => {
                    error!(
                        channel = fallback.name(),
                        error = %fallback_err,
                        "fallback delivery failed too"
                    );
                    DeliveryOutcome::Lost {
                        reason: format!("{reason}; fallback: {fallback_err}"),
                    }
                }
            }
        }
    }
}
