//! Scripted transport used by unit tests

use super::transport::{RequestEnvelope, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

enum Script {
    Replies(Mutex<VecDeque<Result<String, TransportError>>>),
    /// Never answers; returns only when cancelled
    Hang,
}

/// Replays canned replies and records every request it sees
pub struct ScriptedTransport {
    script: Script,
    pub requests: Mutex<Vec<RequestEnvelope>>,
}

impl ScriptedTransport {
    pub fn replying(replies: Vec<Result<String, TransportError>>) -> Self {
        Self {
            script: Script::Replies(Mutex::new(replies.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Transport answering every call with the given JSON body
    pub fn json(body: Value) -> Self {
        Self::replying(vec![Ok(body.to_string())])
    }

    pub fn hanging() -> Self {
        Self {
            script: Script::Hang,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn recorded(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().await.clone()
    }

    async fn reply(
        &self,
        request: &RequestEnvelope,
        cancel: &CancellationToken,
    ) -> Result<String, TransportError> {
        self.requests.lock().await.push(request.clone());
        match &self.script {
            Script::Replies(replies) => replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".to_string()))),
            Script::Hang => {
                cancel.cancelled().await;
                Err(TransportError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &RequestEnvelope,
        cancel: &CancellationToken,
    ) -> Result<String, TransportError> {
        self.reply(request, cancel).await
    }

    async fn run_async(
        &self,
        request: &RequestEnvelope,
        cancel: &CancellationToken,
    ) -> Result<String, TransportError> {
        self.reply(request, cancel).await
    }
}
