// SPDX-License-Identifier: MIT

//! Scripted HTTP+SSE agent server, gated behind `test-support` alongside
//! [`crate::fake_driver::FakeDriver`] so `fleet-engine`/`fleet-daemon`
//! integration tests can drive a real [`crate::agent_client::AgentClient`]
//! against an in-process server rather than mocking the client itself.
//!
//! Implements exactly the surface `AgentClient` speaks (spec 4.3):
//! `GET /health`, `POST /session`, `POST /chat`, `GET
//! /session/{id}/events`. Grounded in `groblegark-coop`'s axum server
//! shape, the same stack `AgentClient` itself is grounded on.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use regex::Regex;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

#[allow(clippy::expect_used)]
static MARKER_IN_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DONE_[a-z0-9]{8}").expect("constant regex pattern is valid"));

/// How the fake server answers `POST /chat` — and, for the SSE variant,
/// what it pushes onto `/session/{id}/events` — one call is counted per
/// `chat` request, starting at 1.
#[derive(Clone)]
pub enum ChatBehavior {
    /// Always acknowledges with empty parts; never completes on its own.
    /// Used to drive a run to its `maxIterations` ceiling.
    Ack,
    /// Echoes the marker carried by the first prompt back as assistant
    /// text in the `complete_at`-th chat response, completing a run
    /// driven by the blocking engine.
    EchoMarkerInChat { complete_at: u32 },
    /// Always acknowledges `chat` with empty parts, but pushes the first
    /// prompt's marker back over the event stream on the `complete_at`-th
    /// call, completing a run driven by the SSE engine.
    EchoMarkerOverEvents { complete_at: u32 },
    /// Never responds. Used to force idle-timeout detection.
    Hang,
}

struct ServerState {
    behavior: ChatBehavior,
    calls: AtomicU32,
    marker: AsyncMutex<Option<String>>,
    events: broadcast::Sender<String>,
}

#[derive(Deserialize)]
struct ChatRequestBody {
    #[serde(default)]
    #[allow(dead_code)]
    session_id: String,
    message: String,
}

fn ack_value() -> serde_json::Value {
    serde_json::json!({"message": {"id": "m1", "role": "assistant"}, "parts": []})
}

fn text_value(text: &str) -> serde_json::Value {
    serde_json::json!({
        "message": {"id": "m1", "role": "assistant"},
        "parts": [{"type": "text", "role": "assistant", "text": text}],
    })
}

/// A scripted agent server bound to a loopback port chosen by the OS.
pub struct FakeAgentServer {
    base_url: String,
    state: Arc<ServerState>,
}

impl FakeAgentServer {
    pub async fn spawn(behavior: ChatBehavior) -> Self {
        let (events, _rx) = broadcast::channel(128);
        let state =
            Arc::new(ServerState { behavior, calls: AtomicU32::new(0), marker: AsyncMutex::new(None), events });

        let app = Router::new()
            .route("/health", get(health))
            .route("/session", post(create_session))
            .route("/chat", post(chat))
            .route("/session/:id/events", get(events_route))
            .with_state(state.clone());

        #[allow(clippy::expect_used)]
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("fake agent server binds a loopback port");
        #[allow(clippy::expect_used)]
        let addr = listener.local_addr().expect("bound listener has a local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { base_url: format!("http://{addr}"), state }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of `POST /chat` calls handled so far.
    pub fn call_count(&self) -> u32 {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Pushes a raw JSON payload onto the event stream directly, bypassing
    /// `ChatBehavior` scripting. Lets tests exercise specific wire events
    /// (`server.heartbeat`, `session.error`) without a dedicated behavior
    /// variant for each one.
    pub fn push_raw_event(&self, payload: impl Into<String>) {
        let _ = self.state.events.send(payload.into());
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn create_session() -> Json<serde_json::Value> {
    Json(serde_json::json!({"session_id": "fake-session"}))
}

async fn chat(State(state): State<Arc<ServerState>>, Json(body): Json<ChatRequestBody>) -> Json<serde_json::Value> {
    let call = state.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if let Some(found) = MARKER_IN_PROMPT.find(&body.message) {
        *state.marker.lock().await = Some(found.as_str().to_string());
    }

    match &state.behavior {
        ChatBehavior::Hang => std::future::pending::<Json<serde_json::Value>>().await,
        ChatBehavior::Ack => Json(ack_value()),
        ChatBehavior::EchoMarkerInChat { complete_at } => {
            if call == *complete_at {
                let marker = state.marker.lock().await.clone().unwrap_or_default();
                Json(text_value(&format!("All done.\n<promise>{marker}</promise>")))
            } else {
                Json(ack_value())
            }
        }
        ChatBehavior::EchoMarkerOverEvents { complete_at } => {
            if call == *complete_at {
                let marker = state.marker.lock().await.clone().unwrap_or_default();
                let message_updated =
                    serde_json::json!({"type": "message.updated", "properties": {"id": "m1", "role": "assistant"}});
                let part_updated = serde_json::json!({
                    "type": "message.part.updated",
                    "properties": {"messageID": "m1", "text": format!("<promise>{marker}</promise>")},
                });
                let _ = state.events.send(message_updated.to_string());
                let _ = state.events.send(part_updated.to_string());
            }
            Json(ack_value())
        }
    }
}

async fn events_route(
    State(state): State<Arc<ServerState>>,
    Path(_session_id): Path<String>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| msg.ok()).map(|payload| Ok(Event::default().data(payload)));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("heartbeat"))
}

#[cfg(test)]
#[path = "fake_agent_server_tests.rs"]
mod tests;
