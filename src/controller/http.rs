//! HTTP transport for the controller API
//!
//! Every call is a JSON POST to `https://<controller>/v1/api`. Background
//! jobs are submitted with `async: true`; the controller answers with a task
//! id which is then polled with `check_task_status` until it stops reporting
//! `"running"`.

use super::envelope::{body_excerpt, MAX_ERROR_BODY_LENGTH};
use super::transport::{RequestEnvelope, Transport, TransportError, SESSION_FIELD};
use crate::config::ClientConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Action used to poll a background job
pub const TASK_STATUS_ACTION: &str = "check_task_status";

/// `results` value of a job that has not finished yet
const RUNNING: &str = "running";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_POLLS: u32 = 180;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    body_excerpt(body, MAX_LOG_BODY_LENGTH).replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// First reply to an async submission
#[derive(Debug, Deserialize)]
struct Submission {
    #[serde(rename = "return")]
    ok: bool,
    #[serde(default)]
    results: Value,
}

/// reqwest-backed [`Transport`]
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    poll_interval: Duration,
    max_polls: u32,
}

impl HttpTransport {
    /// Create a transport posting to `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("Invalid controller URL: {base_url}"))?;
        let client = Client::builder()
            .user_agent(concat!("netctrl/", env!("CARGO_PKG_VERSION")))
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        })
    }

    /// Create a transport from client configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let client = Client::builder()
            .user_agent(concat!("netctrl/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            poll_interval: config.poll_interval(),
            max_polls: config.max_polls,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// POST a JSON body and return the response text
    async fn post<B: Serialize + Sync>(
        &self,
        action: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, TransportError> {
        tracing::debug!("POST {} action={}", self.base_url, action);

        let request = self.client.post(self.base_url.clone()).json(body).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            response = request => response?,
        };

        let status = response.status();
        let text = tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            text = response.text() => text?,
        };

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body_excerpt(&text, MAX_ERROR_BODY_LENGTH),
            });
        }

        Ok(text)
    }

    async fn poll_task(
        &self,
        action: &str,
        task_id: &str,
        session: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, TransportError> {
        let poll = json!({
            "action": TASK_STATUS_ACTION,
            SESSION_FIELD: session,
            "id": task_id,
            "pos": 0,
        });

        for attempt in 1..=self.max_polls {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let body = self
                .post(TASK_STATUS_ACTION, &poll, cancel)
                .await
                .map_err(|e| match e {
                    TransportError::Cancelled => TransportError::Cancelled,
                    other => TransportError::PollFailed {
                        task_id: task_id.to_string(),
                        message: other.to_string(),
                    },
                })?;

            if is_running(&body) {
                tracing::debug!("{}: task {} still running (poll {})", action, task_id, attempt);
                continue;
            }

            tracing::debug!("{}: task {} finished after {} polls", action, task_id, attempt);
            return Ok(body);
        }

        Err(TransportError::PollExhausted {
            task_id: task_id.to_string(),
            polls: self.max_polls,
        })
    }
}

/// A poll reply is non-terminal only when `results` is the string "running"
fn is_running(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("results").and_then(|r| r.as_str()).map(|s| s == RUNNING))
        .unwrap_or(false)
}

/// Task id from a submission reply; the controller sends a string or a number
fn task_id(results: &Value) -> Option<String> {
    match results {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &RequestEnvelope,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, TransportError> {
        self.post(request.action(), request, cancel).await
    }

    async fn run_async(
        &self,
        request: &RequestEnvelope,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, TransportError> {
        let action = request.action();
        let reply = self.post(action, request, cancel).await?;

        let submission: Submission = serde_json::from_str(&reply)
            .map_err(|e| TransportError::BadSubmission(format!("{e}: {}", sanitize_for_log(&reply))))?;

        // Rejected up front: this reply is already the terminal envelope
        if !submission.ok {
            return Ok(reply);
        }

        let Some(task_id) = task_id(&submission.results) else {
            return Err(TransportError::BadSubmission(format!(
                "no task id in {}",
                sanitize_for_log(&reply)
            )));
        };

        tracing::debug!("{} accepted as task {}", action, task_id);
        let session = request.session().unwrap_or_default();
        self.poll_task(action, &task_id, session, cancel).await
    }
}
