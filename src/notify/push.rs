// src/notify/push.rs

//! Remote-push channel: one HTTP POST per report.
//!
//! The credential is part of the URL (`<endpoint>/<api_key>`), so the URL
//! is never logged and `Debug` redacts it.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::RemotePushParams;
use crate::config::model::DEFAULT_PUSH_TIMEOUT_SECS;
use crate::errors::{JobNotifyError, Result};

use super::{Channel, DeliverFuture};

/// Environment variable consulted when the config carries no key.
pub const PUSH_KEY_ENV: &str = "XXTUI_KEY";

pub const DEFAULT_ENDPOINT: &str = "https://www.xxtui.com/xxtui";

/// The credential: explicit configuration first, then [`PUSH_KEY_ENV`].
/// Blank values count as absent. Absence is a `ConfigError`.
pub fn resolve_api_key(
    params: &RemotePushParams,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<String> {
    params
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| {
            env(PUSH_KEY_ENV)
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
        })
        .ok_or_else(|| {
            JobNotifyError::ConfigError(format!(
                "remote-push needs an API key: set `notification.remote_push.api_key` or {PUSH_KEY_ENV}"
            ))
        })
}

pub struct RemotePushChannel {
    client: Client,
    url: String,
    timeout: Duration,
}

impl fmt::Debug for RemotePushChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotePushChannel")
            .field("url", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RemotePushChannel {
    pub fn from_params(
        params: &RemotePushParams,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(params, env)?;
        let endpoint = params
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT);
        let timeout = Duration::from_secs(params.timeout.unwrap_or(DEFAULT_PUSH_TIMEOUT_SECS));
        Self::new(&api_key, endpoint, timeout)
    }

    pub fn new(api_key: &str, endpoint: &str, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(JobNotifyError::ConfigError(
                "remote-push timeout must be greater than zero".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JobNotifyError::ConfigError(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/{}", endpoint.trim_end_matches('/'), api_key),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn post(&self, markdown: &str) -> Result<()> {
        let payload = json!({
            "content": markdown,
            "type": "markdown",
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            // without_url: the key is in the URL.
            .map_err(|e| JobNotifyError::DeliveryError(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(JobNotifyError::DeliveryError(format!(
                "push service returned {status}: {}",
                body.trim()
            )));
        }

        check_business_code(&body)?;
        debug!(%status, "push service accepted report");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

/// A 2xx response may still carry `{"code": <non-zero>, "msg": ...}`.
/// Bodies that are not JSON, or carry no code, count as success.
pub fn check_business_code(body: &str) -> Result<()> {
    let Ok(parsed) = serde_json::from_str::<PushResponse>(body) else {
        return Ok(());
    };
    match parsed.code {
        Some(code) if code != 0 => Err(JobNotifyError::DeliveryError(format!(
            "push service rejected report: {} (code {code})",
            parsed.msg.as_deref().unwrap_or("unknown error")
        ))),
        _ => Ok(()),
    }
}

impl Channel for RemotePushChannel {
    fn name(&self) -> &'static str {
        "remote-push"
    }

    fn deliver<'a>(&'a self, markdown: &'a str) -> DeliverFuture<'a> {
        Box::pin(self.post(markdown))
    }
}
