// SPDX-License-Identifier: MIT

//! HTTP + SSE client for the agent server started by the Preparation
//! Pipeline inside each provider's sandbox (spec 4.3).
//!
//! The teacher's own agent adapters speak a hand-rolled protocol over raw
//! TCP (see `agent::docker::http`); that protocol has no SSE framing. This
//! client instead follows the real HTTP+SSE agent-server contract, using
//! the same reqwest/tokio-util stack as the sibling coop server.

use crate::sse::{split_lines, SseFrameBuilder};
use fleet_core::Provider;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum AgentClientError {
    #[error("request to agent server failed: {0}")]
    Request(String),
    #[error("agent server returned status {0}")]
    Status(u16),
    #[error("response body was not valid JSON: {0}")]
    Decode(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for AgentClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AgentClientError::Timeout(Duration::from_secs(0))
        } else {
            AgentClientError::Request(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateSessionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    cwd: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatBody<'a> {
    session_id: &'a str,
    message: &'a str,
}

/// Identity of the message the agent server created for a `chat` call.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    pub role: String,
}

/// One part of a chat response: either textual content with a role hint, or
/// a tool invocation/result record (spec 4.3).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatPart {
    Text {
        #[serde(default)]
        role: Option<String>,
        text: String,
    },
    Tool {
        name: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        state: Option<serde_json::Value>,
    },
}

/// `chat(sessionId, prompt)`'s response: returned once the agent server has
/// finished responding (spec 4.3).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: MessageInfo,
    #[serde(default)]
    pub parts: Vec<ChatPart>,
}

/// One decoded SSE frame from the agent server's event stream.
///
/// Frames have a `{type, properties}` shape (spec 4.3); this wrapper keeps
/// the raw JSON and exposes the couple of fields every consumer needs
/// (`type`, and the `sessionID` used for session-filtering discipline)
/// without committing to a closed set of event shapes here — that typed
/// parsing belongs to the Iteration Engine, which knows which event kinds
/// it cares about.
#[derive(Debug, Clone)]
pub struct ServerEvent {
    pub raw: serde_json::Value,
}

impl ServerEvent {
    pub fn event_type(&self) -> Option<&str> {
        self.raw.get("type").and_then(|v| v.as_str())
    }

    pub fn properties(&self) -> Option<&serde_json::Value> {
        self.raw.get("properties")
    }

    /// The `sessionID` carried by this event, if any. Every event that
    /// scopes to a session carries this field; events observed from the
    /// agent server that carry it but don't match the current iteration's
    /// session are discarded by the Iteration Engine (spec 4.5).
    pub fn session_id(&self) -> Option<&str> {
        self.properties()
            .and_then(|p| p.get("sessionID").or_else(|| p.get("session_id")))
            .and_then(|v| v.as_str())
    }
}

/// Thin reqwest-backed client bound to one provider's agent server URL.
///
/// Grounded in `groblegark-coop`'s axum/reqwest pairing (the actual HTTP
/// surface the teacher's own sandboxes expose), not in the teacher's raw-TCP
/// `agent::docker::http` client.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
    provider: Provider,
}

impl AgentClient {
    pub fn new(base_url: impl Into<String>, provider: Provider) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
            provider,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub async fn health(&self) -> Result<bool, AgentClientError> {
        let resp = self.http.get(format!("{}/health", self.base_url)).send().await?;
        Ok(resp.status().is_success())
    }

    pub async fn create_session(&self, cwd: Option<&str>) -> Result<CreateSessionResponse, AgentClientError> {
        let resp = self
            .http
            .post(format!("{}/session", self.base_url))
            .json(&CreateSessionBody { cwd })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AgentClientError::Status(resp.status().as_u16()));
        }
        resp.json().await.map_err(|e| AgentClientError::Decode(e.to_string()))
    }

    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatResponse, AgentClientError> {
        let resp = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&ChatBody { session_id, message })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AgentClientError::Status(resp.status().as_u16()));
        }
        resp.json().await.map_err(|e| AgentClientError::Decode(e.to_string()))
    }

    /// Subscribes to the agent server's SSE event stream, forwarding
    /// decoded frames until the stream ends or `cancel` fires.
    ///
    /// Runs the HTTP connection on a spawned task so callers can `.recv()`
    /// from the returned channel without holding the response body open on
    /// their own stack.
    pub fn subscribe_events(
        &self,
        session_id: &str,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Result<ServerEvent, AgentClientError>> {
        let (tx, rx) = mpsc::channel(128);
        let http = self.http.clone();
        let url = format!("{}/session/{}/events", self.base_url, session_id);
        tokio::spawn(async move {
            let resp = match http.get(&url).send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    let _ = tx.send(Err(AgentClientError::Status(r.status().as_u16()))).await;
                    return;
                }
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            };
            let mut stream = resp.bytes_stream();
            let mut buffer = String::new();
            let mut frame = SseFrameBuilder::new();
            loop {
                let chunk = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = stream.next() => next,
                };
                let Some(chunk) = chunk else { break };
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(AgentClientError::Request(e.to_string()))).await;
                        break;
                    }
                };
                let text = String::from_utf8_lossy(&bytes);
                for line in split_lines(&mut buffer, &text) {
                    if let Some(payload) = frame.push_line(&line) {
                        let parsed = serde_json::from_str::<serde_json::Value>(&payload)
                            .map(|raw| ServerEvent { raw })
                            .map_err(|e| AgentClientError::Decode(e.to_string()));
                        if tx.send(parsed).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });
        rx
    }
}

#[cfg(test)]
#[path = "agent_client_tests.rs"]
mod tests;
