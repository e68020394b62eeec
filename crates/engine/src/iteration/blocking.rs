// SPDX-License-Identifier: MIT

//! Variant A: the blocking chat-based iteration engine (spec 4.5/4.6).
//!
//! Sends one `chat` request per iteration and waits for its response before
//! deciding whether to continue. Simpler and more portable than the SSE
//! variant, but can't observe an idle agent mid-response — its only timeout
//! is the global `maxIterations * 180s` ceiling, checked between
//! iterations. Kept as the fallback for agent servers that don't expose the
//! `/session/{id}/events` stream.

use async_trait::async_trait;
use fleet_core::{Clock, CompletionReason, EventData};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    build_iteration_prompt, handle_event, is_heartbeat, record_message_parts, IterationCtx,
    IterationEngine, IterationError, IterationOutcome, RoleTracker,
};
use crate::marker::contains_marker;
use crate::sink::ProviderSink;
use fleet_adapters::agent_client::{AgentClient, AgentClientError, CreateSessionResponse};

/// Seconds budgeted per iteration toward the global timeout (spec 4.6).
const SECONDS_PER_ITERATION: u64 = 180;

/// Delay before the single session-creation retry spec 7 mandates for this
/// variant.
const SESSION_RETRY_DELAY: Duration = Duration::from_millis(500);

/// spec 7's recovery rule: "iteration engines retry session creation once
/// with a short delay on failure (blocking variant)".
async fn create_session_with_retry(client: &AgentClient) -> Result<CreateSessionResponse, AgentClientError> {
    match client.create_session(None).await {
        Ok(session) => Ok(session),
        Err(err) => {
            warn!(error = %err, "session creation failed, retrying once");
            tokio::time::sleep(SESSION_RETRY_DELAY).await;
            client.create_session(None).await
        }
    }
}

pub struct BlockingChatEngine;

impl BlockingChatEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlockingChatEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: Clock> IterationEngine<C> for BlockingChatEngine {
    async fn run(
        &self,
        client: &AgentClient,
        ctx: IterationCtx<C>,
        sink: &dyn ProviderSink,
    ) -> Result<IterationOutcome, IterationError> {
        let deadline = ctx.clock.now()
            + Duration::from_secs(SECONDS_PER_ITERATION * u64::from(ctx.config.max_iterations.max(1)));

        let session = create_session_with_retry(client).await?;
        let agent_session_id: fleet_core::AgentSessionId = session.session_id.clone().into();
        sink.set_agent_session(Some(agent_session_id));

        // spec 4.5 Variant A: "fork a background event-consumer that emits
        // tool/thought events ... while `chat` blocks". Opened once for the
        // whole run, same as the SSE variant, so streamed progress is
        // surfaced even though completion detection still waits on `chat`'s
        // own returned parts.
        let cancel = CancellationToken::new();
        let mut events = client.subscribe_events(&session.session_id, cancel.clone());
        let _cancel_guard = cancel.drop_guard();

        let prompt = build_iteration_prompt(&ctx.task, &ctx.marker);
        let mut tracker = RoleTracker::new();

        for iteration in 1..=ctx.config.max_iterations {
            if ctx.clock.now() >= deadline {
                warn!(provider = ?ctx.provider, "blocking iteration engine hit global timeout");
                return Ok(finish(iteration.saturating_sub(1), CompletionReason::IdleTimeout, false, sink));
            }

            sink.emit(EventData::RalphIteration { iteration, max_iterations: ctx.config.max_iterations });

            let message = if iteration == 1 {
                prompt.clone()
            } else {
                "Continue.".to_string()
            };

            tracker.reset();
            let session_id = session.session_id.clone();
            let chat_client = client.clone();
            let mut chat_task = tokio::spawn(async move { chat_client.chat(&session_id, &message).await });

            let response = loop {
                tokio::select! {
                    chat_result = &mut chat_task => {
                        match chat_result {
                            Ok(Ok(response)) => break response,
                            Ok(Err(err)) => return Err(IterationError::from(err)),
                            Err(_join_err) => return Err(IterationError::Aborted),
                        }
                    }
                    next = events.recv() => {
                        let Some(event) = next else { continue };
                        let Ok(event) = event else { continue };
                        if is_heartbeat(&event) {
                            continue;
                        }
                        if let Some(event_session) = event.session_id() {
                            if event_session != session.session_id.as_str() {
                                continue;
                            }
                        }
                        handle_event(&event, &mut tracker, sink);
                    }
                }
            };

            record_message_parts(
                &response.message.id,
                &response.message.role,
                &response.parts,
                &mut tracker,
                sink,
            );

            if contains_marker(tracker.assistant_text(), &ctx.marker) {
                debug!(provider = ?ctx.provider, iteration, "completion marker observed");
                return Ok(finish(iteration, CompletionReason::CompletionMarker, true, sink));
            }
        }

        Ok(finish(ctx.config.max_iterations, CompletionReason::MaxIterations, false, sink))
    }
}

fn finish(
    iterations: u32,
    reason: CompletionReason,
    success: bool,
    sink: &dyn ProviderSink,
) -> IterationOutcome {
    sink.emit(EventData::RalphComplete { iterations, reason, success });
    IterationOutcome { success, iterations, reason }
}

#[cfg(test)]
#[path = "blocking_tests.rs"]
mod tests;
