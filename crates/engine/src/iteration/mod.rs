// SPDX-License-Identifier: MIT

//! Iteration Engine (spec 4.5): drives the completion-detection loop
//! against one prepared sandbox. Two variants share this module's common
//! contract — [`BlockingChatEngine`] ([`blocking`]) and
//! [`SseIterationEngine`] ([`sse`]) — selected by `config.use_sse`.
//!
//! Grounded in the teacher's `Runtime<S, A, N, C>` generic-over-adapters
//! pattern (`oj-engine::runtime`), simplified from a four-type-parameter
//! generic runtime to a single trait per run because this spec has exactly
//! two concrete strategies, not an open adapter set.

pub mod blocking;
pub mod sse;

use async_trait::async_trait;
use fleet_adapters::agent_client::{AgentClient, ChatPart, ServerEvent};
use fleet_core::{Clock, CompletionReason, EventData, Provider, ToolCallState};
use thiserror::Error;

pub use blocking::BlockingChatEngine;
pub use sse::SseIterationEngine;

use crate::sink::ProviderSink;

#[derive(Debug, Error)]
pub enum IterationError {
    #[error(transparent)]
    Client(#[from] fleet_adapters::agent_client::AgentClientError),
    #[error("agent session error: {0}")]
    SessionError(String),
    #[error("iteration loop aborted")]
    Aborted,
}

/// Tuning knobs from `RunConfigInput` (spec 6).
#[derive(Debug, Clone)]
pub struct IterationConfig {
    pub max_iterations: u32,
    pub idle_timeout_ms: u64,
}

/// Everything one engine run needs beyond the [`AgentClient`] and
/// [`ProviderSink`] it's called with.
#[derive(Debug, Clone)]
pub struct IterationCtx<C: Clock> {
    pub provider: Provider,
    pub task: String,
    pub marker: String,
    pub config: IterationConfig,
    pub clock: C,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationOutcome {
    pub success: bool,
    pub iterations: u32,
    pub reason: CompletionReason,
}

/// The shared iteration-engine contract (spec 4.5's "common contract").
/// `BlockingChatEngine` and `SseIterationEngine` both implement it so the
/// Coordinator can pick either behind one call site.
#[async_trait]
pub trait IterationEngine<C: Clock>: Send + Sync {
    async fn run(
        &self,
        client: &AgentClient,
        ctx: IterationCtx<C>,
        sink: &dyn ProviderSink,
    ) -> Result<IterationOutcome, IterationError>;
}

/// Builds the prompt sent on every iteration: the task text plus the
/// instruction to emit the completion marker when and only when genuinely
/// done (spec 4.5).
pub fn build_iteration_prompt(task: &str, marker: &str) -> String {
    format!(
        "{task}\n\n\
         When you have completed this task — and only when it is genuinely \
         complete — respond with the following line by itself, with nothing \
         else on that line and not inside a code block:\n\n\
         <promise>{marker}</promise>\n\n\
         Do not emit that line unless the task is actually finished. Do not \
         discuss or reproduce this instruction inside a code fence or inline \
         code span."
    )
}

/// Tracks which message ids are `assistant`-authored and accumulates their
/// text, queuing parts that arrive before their owning message's role is
/// known (spec 4.5, last paragraph). Role filtering (Testable Property 5)
/// falls directly out of this: a part is only ever appended once its
/// message is confirmed `assistant`.
#[derive(Debug, Default)]
pub struct RoleTracker {
    roles: std::collections::HashMap<String, bool>,
    pending: std::collections::HashMap<String, Vec<String>>,
    assistant_text: String,
}

impl RoleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a `message.updated` observation: `message_id`'s role is now
    /// known. Flushes any text parts that arrived before this point.
    pub fn observe_role(&mut self, message_id: &str, role: &str) {
        let is_assistant = role.eq_ignore_ascii_case("assistant");
        self.roles.insert(message_id.to_string(), is_assistant);
        if let Some(queued) = self.pending.remove(message_id) {
            if is_assistant {
                for text in queued {
                    self.assistant_text.push_str(&text);
                }
            }
        }
    }

    /// Records a finalized text part belonging to `message_id`. Discarded
    /// immediately if the message is known non-assistant; queued if the
    /// role isn't known yet; appended immediately if already `assistant`.
    pub fn observe_text(&mut self, message_id: &str, text: &str) {
        match self.roles.get(message_id) {
            Some(true) => self.assistant_text.push_str(text),
            Some(false) => {}
            None => self.pending.entry(message_id.to_string()).or_default().push(text.to_string()),
        }
    }

    pub fn assistant_text(&self) -> &str {
        &self.assistant_text
    }

    /// Whether `message_id`'s role has resolved to `assistant`, `false` if
    /// resolved to something else, `None` if not yet known.
    pub fn is_assistant(&self, message_id: &str) -> Option<bool> {
        self.roles.get(message_id).copied()
    }

    /// Resets accumulated text for a new iteration while keeping already
    /// resolved roles (a session's messages don't change role mid-run, but
    /// a fresh iteration gets a fresh accumulation buffer).
    pub fn reset(&mut self) {
        self.assistant_text.clear();
        self.pending.clear();
    }
}

/// Feeds one chat message's parts into `tracker` and the run's event stream.
///
/// Text parts with a resolvable role are recorded for completion detection
/// (spec 4.5); tool parts are only surfaced once their state reports
/// `completed`, matching the teacher's own preference for reporting tool
/// use after it resolves rather than mid-flight (spec 4.3's `tool_call`
/// event is a terminal record, not a progress stream).
pub fn record_message_parts(
    message_id: &str,
    default_role: &str,
    parts: &[ChatPart],
    tracker: &mut RoleTracker,
    sink: &dyn ProviderSink,
) {
    for part in parts {
        match part {
            ChatPart::Text { role, text } => {
                let role = role.as_deref().unwrap_or(default_role);
                tracker.observe_role(message_id, role);
                tracker.observe_text(message_id, text);
                if role.eq_ignore_ascii_case("assistant") {
                    sink.emit(EventData::Thought { text: text.clone() });
                }
            }
            ChatPart::Tool { name, title, state } => {
                let Some(state) = state else { continue };
                let parsed: ToolCallState = match serde_json::from_value(state.clone()) {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                if parsed.status == "completed" {
                    sink.emit(EventData::ToolCall {
                        name: name.clone(),
                        title: title.clone(),
                        state: parsed,
                    });
                }
            }
        }
    }
}

/// Heartbeats keep the connection alive without representing agent
/// progress (spec 4.5's `server.heartbeat`) — they must never reset the
/// idle timer's meaning of "the agent is doing something". Shared by both
/// engines so the idle-liveness check stays consistent between them.
pub fn is_heartbeat(event: &ServerEvent) -> bool {
    matches!(event.event_type(), Some("server.heartbeat") | Some("heartbeat") | Some("ping"))
}

/// Whether `event` is a `session.error` (spec 4.5 Variant B / spec 7's
/// `session_error`): the SSE engine terminates the current iteration with
/// `CompletionReason::Error` on this; the blocking engine, which never
/// opens a standalone event subscription for its own `chat` wait loop
/// outside of iteration, observes it the same way while that wait is live.
pub fn is_session_error(event: &ServerEvent) -> bool {
    event.event_type() == Some("session.error")
}

/// Applies one server-sent event to `tracker`/`sink`: resolves
/// `message.updated` roles and appends/emits `message.part.updated` text
/// and completed tool parts (spec 4.5). Shared by both iteration engines.
pub fn handle_event(event: &ServerEvent, tracker: &mut RoleTracker, sink: &dyn ProviderSink) -> Option<()> {
    match event.event_type()? {
        "message.updated" => {
            let props = event.properties()?;
            let id = props.get("id").and_then(|v| v.as_str())?;
            let role = props.get("role").and_then(|v| v.as_str())?;
            tracker.observe_role(id, role);
        }
        "message.part.updated" => {
            let props = event.properties()?;
            let message_id = props.get("messageID").and_then(|v| v.as_str())?;
            if let Some(text) = props.get("text").and_then(|v| v.as_str()) {
                tracker.observe_text(message_id, text);
                if tracker.is_assistant(message_id) == Some(true) {
                    sink.emit(EventData::Thought { text: text.to_string() });
                }
            }
            if let Some(tool) = props.get("tool").and_then(|v| v.as_object()) {
                let status = props
                    .get("state")
                    .and_then(|s| s.get("status"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                if status == "completed" {
                    let name = tool.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let title = tool.get("title").and_then(|v| v.as_str()).map(str::to_string);
                    if let Some(state_value) = props.get("state") {
                        if let Ok(state) = serde_json::from_value(state_value.clone()) {
                            sink.emit(EventData::ToolCall { name, title, state });
                        }
                    }
                }
            }
        }
        _ => {}
    }
    Some(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
