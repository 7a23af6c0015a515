//! Controller Client
//!
//! Holds the session identity obtained at login together with the
//! dispatcher that injects it into every request.

use super::checker::{BasicCheck, ResultChecker};
use super::dispatch::{AsyncOperation, CallOptions, Completion, Dispatcher, METHOD_POST};
use super::envelope::{body_excerpt, null_as_empty, MAX_ERROR_BODY_LENGTH};
use super::http::HttpTransport;
use super::transport::{RequestEnvelope, Transport};
use crate::config::ClientConfig;
use crate::error::{ControllerError, Result, Stage};
use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOGIN_ACTION: &str = "login";

#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(rename = "return")]
    ok: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    reason: String,
    #[serde(rename = "CID", default)]
    cid: Option<String>,
}

/// Log in and return the session identity
pub async fn login(transport: &dyn Transport, username: &str, password: &str) -> Result<String> {
    let mut fields = Map::new();
    fields.insert("username".to_string(), Value::String(username.to_string()));
    fields.insert("password".to_string(), Value::String(password.to_string()));
    let request = RequestEnvelope::without_session(LOGIN_ACTION, &fields);

    tracing::debug!("Logging in to controller as {}", username);
    let raw = transport
        .send(&request, &CancellationToken::new())
        .await
        .map_err(|e| ControllerError::from_transport(LOGIN_ACTION, Stage::Submit, e))?;

    let reply: LoginReply = serde_json::from_str(&raw).map_err(|e| ControllerError::Decode {
        action: LOGIN_ACTION.to_string(),
        what: "login reply".to_string(),
        message: e.to_string(),
        body: body_excerpt(&raw, MAX_ERROR_BODY_LENGTH),
    })?;

    BasicCheck.check(LOGIN_ACTION, METHOD_POST, &reply.reason, reply.ok)?;

    reply
        .cid
        .filter(|cid| !cid.is_empty())
        .ok_or_else(|| ControllerError::MissingResult {
            action: LOGIN_ACTION.to_string(),
            field: "CID".to_string(),
        })
}

/// Session-bound controller client
#[derive(Clone, Debug)]
pub struct ControllerClient {
    dispatcher: Dispatcher,
}

impl ControllerClient {
    /// Connect using configuration: build the HTTP transport and log in
    pub async fn connect(config: &ClientConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(config)?;

        let client = Self::login_with(Arc::new(transport), &config.username, &config.password)
            .await
            .with_context(|| format!("Failed to log in to controller {}", config.controller_ip))?;

        tracing::info!("Connected to controller {}", config.controller_ip);
        Ok(client)
    }

    /// Log in over an existing transport
    pub async fn login_with(transport: Arc<dyn Transport>, username: &str, password: &str) -> Result<Self> {
        let cid = login(transport.as_ref(), username, password).await?;
        Ok(Self::with_session(transport, cid))
    }

    /// Client for an already established session
    pub fn with_session(transport: Arc<dyn Transport>, cid: impl Into<String>) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport, cid),
        }
    }

    pub fn session(&self) -> &str {
        self.dispatcher.session()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run a background job to completion
    pub async fn post_async(&self, op: &AsyncOperation, opts: &CallOptions) -> Result<Completion> {
        self.dispatcher.submit(op, opts).await
    }

    /// Single request/response call
    pub async fn post(&self, op: &AsyncOperation, opts: &CallOptions) -> Result<Completion> {
        self.dispatcher.call(op, opts).await
    }

    /// Convenience for actions that only need the default checker
    pub async fn post_async_fields(&self, action: &str, fields: Value) -> Result<Completion> {
        let op = AsyncOperation::new(action, &fields)?;
        self.post_async(&op, &CallOptions::new()).await
    }
}

/// Build a JSON object payload from key/value pairs
pub fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}
