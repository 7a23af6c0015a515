//! Async dispatcher
//!
//! Submits an operation, lets the transport wait for the controller's
//! background job, then decodes, classifies and runs hooks in that order.
//! Each stage only runs if the previous one succeeded.

use super::checker::{BasicCheck, ResultChecker};
use super::envelope::{body_excerpt, HookPayload, ResponseEnvelope, MAX_ERROR_BODY_LENGTH};
use super::hooks::{HookRegistry, ResponseHook};
use super::transport::{RequestEnvelope, Transport};
use crate::error::{ControllerError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Method name reported to result checkers; every call is a JSON POST
pub const METHOD_POST: &str = "Post";

/// One remote operation: an action name plus the caller's fields.
///
/// Session metadata is never part of the payload; the dispatcher adds it
/// when building the wire request.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncOperation {
    action: String,
    payload: Map<String, Value>,
}

impl AsyncOperation {
    /// Build from any serializable request object.
    /// The object must serialize to a JSON object (or null).
    pub fn new<T: Serialize + ?Sized>(action: impl Into<String>, payload: &T) -> Result<Self> {
        let action = action.into();
        if action.trim().is_empty() {
            return Err(ControllerError::InvalidOperation(
                "action must not be empty".to_string(),
            ));
        }

        let value = serde_json::to_value(payload).map_err(|e| {
            ControllerError::InvalidOperation(format!("{action}: payload not serializable: {e}"))
        })?;

        let payload = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ControllerError::InvalidOperation(format!(
                    "{action}: payload must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(Self { action, payload })
    }

    /// Operation without request fields
    pub fn bare(action: impl Into<String>) -> Result<Self> {
        Self::new(action, &Value::Null)
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Per-call configuration: checker, hooks, timeout and cancellation.
///
/// Built up front and passed by reference into a single call.
#[derive(Clone)]
pub struct CallOptions {
    checker: Arc<dyn ResultChecker>,
    hooks: HookRegistry,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            checker: Arc::new(BasicCheck),
            hooks: HookRegistry::new(),
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("hooks", &self.hooks)
            .field("timeout", &self.timeout)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checker(mut self, checker: impl ResultChecker + 'static) -> Self {
        self.checker = Arc::new(checker);
        self
    }

    pub fn with_hook(mut self, hook: ResponseHook) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Outcome of a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    action: String,
    results: Value,
    extracted: Option<String>,
}

impl Completion {
    /// Completion with no hook output, e.g. replayed from a stored reply
    pub fn new(action: impl Into<String>, results: Value) -> Self {
        Self {
            action: action.into(),
            results,
            extracted: None,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn results(&self) -> &Value {
        &self.results
    }

    pub fn into_results(self) -> Value {
        self.results
    }

    /// `results` as a string, if it is one
    pub fn results_str(&self) -> Option<&str> {
        self.results.as_str()
    }

    /// First non-empty value produced by the call's hooks
    pub fn extracted(&self) -> Option<&str> {
        self.extracted.as_deref()
    }

    /// Typed decode of `results`
    pub fn decode_results<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.results).map_err(|e| ControllerError::Decode {
            action: self.action.clone(),
            what: "results".to_string(),
            message: e.to_string(),
            body: body_excerpt(&self.results.to_string(), MAX_ERROR_BODY_LENGTH),
        })
    }
}

/// Pick a name: hook result first, then a non-empty caller value, else fail
pub fn resolve_name(
    action: &str,
    field: &str,
    extracted: Option<&str>,
    fallback: Option<&str>,
) -> Result<String> {
    extracted
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.filter(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| ControllerError::MissingResult {
            action: action.to_string(),
            field: field.to_string(),
        })
}

/// Runs operations against the controller for one session
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    cid: Arc<str>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, cid: impl Into<String>) -> Self {
        Self {
            transport,
            cid: Arc::from(cid.into()),
        }
    }

    pub fn session(&self) -> &str {
        &self.cid
    }

    /// Run `op` as a background job and wait for it to finish.
    ///
    /// The async flag is always sent as `true`, whatever the payload says.
    pub async fn submit(&self, op: &AsyncOperation, opts: &CallOptions) -> Result<Completion> {
        self.execute(op, opts, true).await
    }

    /// Single request/response call through the same decode, classify and
    /// hook pipeline
    pub async fn call(&self, op: &AsyncOperation, opts: &CallOptions) -> Result<Completion> {
        self.execute(op, opts, false).await
    }

    async fn execute(&self, op: &AsyncOperation, opts: &CallOptions, run_async: bool) -> Result<Completion> {
        let call_id = Uuid::new_v4();
        let span = tracing::debug_span!("controller_call", action = %op.action(), %call_id, run_async);

        async move {
            let action = op.action();
            let request = RequestEnvelope::build(action, op.payload(), &self.cid, run_async);

            let raw = self.exchange(&request, opts, run_async).await?;
            let envelope = ResponseEnvelope::parse(action, &raw)?;

            opts.checker
                .check(action, METHOD_POST, &envelope.reason, envelope.ok)?;

            let payload = HookPayload::from_results(&envelope.results);
            if payload.is_empty() && !opts.hooks.is_empty() {
                tracing::debug!("{}: results carry no fields for hooks", action);
            }
            let extracted = opts.hooks.run(&payload);

            tracing::info!("{} completed", action);
            Ok(Completion {
                action: action.to_string(),
                results: envelope.results,
                extracted,
            })
        }
        .instrument(span)
        .await
    }

    async fn exchange(&self, request: &RequestEnvelope, opts: &CallOptions, run_async: bool) -> Result<String> {
        let action = request.action();
        if opts.cancel.is_cancelled() {
            return Err(ControllerError::Cancelled {
                action: action.to_string(),
            });
        }

        tracing::debug!("submitting {} (async={})", action, run_async);
        let pending = async {
            if run_async {
                self.transport.run_async(request, &opts.cancel).await
            } else {
                self.transport.send(request, &opts.cancel).await
            }
        };

        let outcome = match opts.timeout {
            Some(after) => match tokio::time::timeout(after, pending).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!("{} timed out after {:?}", action, after);
                    return Err(ControllerError::Timeout {
                        action: action.to_string(),
                        after,
                    });
                }
            },
            None => pending.await,
        };

        outcome.map_err(|e| {
            let stage = e.stage();
            ControllerError::from_transport(action, stage, e)
        })
    }
}
