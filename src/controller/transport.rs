//! Transport seam
//!
//! The dispatcher never talks HTTP itself. It hands a [`RequestEnvelope`] to
//! a [`Transport`] and gets back the raw body of the terminal response.

use crate::error::Stage;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Request field carrying the action name
pub const ACTION_FIELD: &str = "action";
/// Request field carrying the session identity
pub const SESSION_FIELD: &str = "CID";
/// Request field asking the controller to run the action as a background job
pub const ASYNC_FIELD: &str = "async";

/// Errors raised below the envelope layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to poll task {task_id}: {message}")]
    PollFailed { task_id: String, message: String },

    #[error("task {task_id} still running after {polls} polls")]
    PollExhausted { task_id: String, polls: u32 },

    #[error("unexpected submission reply: {0}")]
    BadSubmission(String),

    #[error("invalid controller URL: {0}")]
    InvalidUrl(String),

    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Stage of the call this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Self::PollFailed { .. } | Self::PollExhausted { .. } => Stage::Poll,
            _ => Stage::Submit,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// The request actually put on the wire.
///
/// Built fresh for every call from the caller's fields plus injected
/// session metadata; the caller's own object is never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RequestEnvelope {
    fields: Map<String, Value>,
}

impl RequestEnvelope {
    /// Merge caller fields with the action, the session identity and,
    /// for background jobs, the async flag.
    ///
    /// Injected fields are written last so any caller-supplied value for
    /// them is overwritten.
    pub fn build(action: &str, caller: &Map<String, Value>, cid: &str, run_async: bool) -> Self {
        let mut fields = caller.clone();
        fields.insert(ACTION_FIELD.to_string(), Value::String(action.to_string()));
        fields.insert(SESSION_FIELD.to_string(), Value::String(cid.to_string()));
        if run_async {
            fields.insert(ASYNC_FIELD.to_string(), Value::Bool(true));
        } else {
            fields.remove(ASYNC_FIELD);
        }
        Self { fields }
    }

    /// Envelope for calls made before a session exists (login)
    pub fn without_session(action: &str, caller: &Map<String, Value>) -> Self {
        let mut fields = caller.clone();
        fields.insert(ACTION_FIELD.to_string(), Value::String(action.to_string()));
        fields.remove(SESSION_FIELD);
        fields.remove(ASYNC_FIELD);
        Self { fields }
    }

    pub fn action(&self) -> &str {
        self.fields
            .get(ACTION_FIELD)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    pub fn session(&self) -> Option<&str> {
        self.fields.get(SESSION_FIELD).and_then(|v| v.as_str())
    }

    pub fn is_async(&self) -> bool {
        self.fields
            .get(ASYNC_FIELD)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Moves request envelopes to the controller
///
/// Implementations own retries, polling and HTTP details. Both methods
/// return the raw body of the final response envelope and must give up
/// promptly with [`TransportError::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Single request/response exchange
    async fn send(
        &self,
        request: &RequestEnvelope,
        cancel: &CancellationToken,
    ) -> Result<String, TransportError>;

    /// Submit a background job and wait until it reaches a terminal state
    async fn run_async(
        &self,
        request: &RequestEnvelope,
        cancel: &CancellationToken,
    ) -> Result<String, TransportError>;
}
