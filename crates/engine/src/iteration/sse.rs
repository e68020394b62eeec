// SPDX-License-Identifier: MIT

//! Variant B: the SSE-driven iteration engine (spec 4.5/4.6) — the default
//! engine (spec 9). Subscribes to the agent server's event stream and
//! watches it directly instead of waiting on one blocking `chat` response,
//! so it can detect the completion marker and an idle agent in real time.

use async_trait::async_trait;
use fleet_core::{Clock, CompletionReason, EventData};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    build_iteration_prompt, handle_event, is_heartbeat, is_session_error, record_message_parts,
    IterationCtx, IterationEngine, IterationError, IterationOutcome, RoleTracker,
};
use crate::marker::contains_marker;
use crate::sink::ProviderSink;
use fleet_adapters::agent_client::AgentClient;

pub struct SseIterationEngine;

impl SseIterationEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SseIterationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: Clock> IterationEngine<C> for SseIterationEngine {
    async fn run(
        &self,
        client: &AgentClient,
        ctx: IterationCtx<C>,
        sink: &dyn ProviderSink,
    ) -> Result<IterationOutcome, IterationError> {
        let session = client.create_session(None).await?;
        let agent_session_id: fleet_core::AgentSessionId = session.session_id.clone().into();
        sink.set_agent_session(Some(agent_session_id));

        let cancel = CancellationToken::new();
        let mut events = client.subscribe_events(&session.session_id, cancel.clone());
        let _cancel_guard = cancel.drop_guard();

        let prompt = build_iteration_prompt(&ctx.task, &ctx.marker);
        let idle_timeout = Duration::from_millis(ctx.config.idle_timeout_ms);
        let mut tracker = RoleTracker::new();

        // Tracks the last *non-heartbeat* event time (spec 4.5: "Detect
        // liveness by tracking the last non-heartbeat event time"), driven
        // off `ctx.clock` rather than wall time so idle-timeout behavior is
        // deterministic under `FakeClock` in tests. Re-derived every pass
        // through the inner loop instead of re-arming a fresh `idle_timeout`
        // on every wakeup, so a heartbeat — or any other event — can never
        // silently reset how much idle budget remains.
        let mut last_activity = ctx.clock.now();

        // One `chat` round trip per iteration (spec 4.6's iteration count is
        // "how many prompts were sent"), but unlike the blocking variant we
        // also watch the event stream *while* that call is in flight, so the
        // completion marker and an idle agent are both caught as soon as
        // they happen rather than only once the call returns.
        for iteration in 1..=ctx.config.max_iterations {
            sink.emit(EventData::RalphIteration { iteration, max_iterations: ctx.config.max_iterations });

            let message = if iteration == 1 { prompt.clone() } else { "Continue.".to_string() };
            let session_id = session.session_id.clone();
            let chat_client = client.clone();
            let mut chat_task = tokio::spawn(async move { chat_client.chat(&session_id, &message).await });

            let round_outcome = loop {
                let remaining = idle_timeout.saturating_sub(ctx.clock.now().saturating_duration_since(last_activity));
                if remaining.is_zero() {
                    warn!(provider = ?ctx.provider, "iteration engine idle timeout");
                    break Some(finish(iteration, CompletionReason::IdleTimeout, false, sink));
                }

                tokio::select! {
                    chat_result = &mut chat_task => {
                        let response = match chat_result {
                            Ok(Ok(response)) => response,
                            Ok(Err(err)) => return Err(IterationError::from(err)),
                            Err(_join_err) => return Err(IterationError::Aborted),
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
                            break Some(finish(iteration, CompletionReason::CompletionMarker, true, sink));
                        }
                        break None;
                    }
                    next = tokio::time::timeout(remaining, events.recv()) => {
                        let event = match next {
                            Ok(Some(Ok(event))) => event,
                            Ok(Some(Err(err))) => {
                                warn!(provider = ?ctx.provider, error = %err, "agent event stream error");
                                break Some(finish(iteration, CompletionReason::Error, false, sink));
                            }
                            Ok(None) => {
                                warn!(provider = ?ctx.provider, "agent server event stream ended before completion");
                                break Some(finish(iteration, CompletionReason::Error, false, sink));
                            }
                            Err(_elapsed) => {
                                warn!(provider = ?ctx.provider, "iteration engine idle timeout");
                                break Some(finish(iteration, CompletionReason::IdleTimeout, false, sink));
                            }
                        };
                        if is_heartbeat(&event) {
                            continue;
                        }
                        last_activity = ctx.clock.now();
                        if let Some(event_session) = event.session_id() {
                            if event_session != session.session_id.as_str() {
                                continue;
                            }
                        }
                        if is_session_error(&event) {
                            warn!(provider = ?ctx.provider, iteration, "agent session error");
                            break Some(finish(iteration, CompletionReason::Error, false, sink));
                        }
                        handle_event(&event, &mut tracker, sink);
                        if contains_marker(tracker.assistant_text(), &ctx.marker) {
                            debug!(provider = ?ctx.provider, iteration, "completion marker observed");
                            break Some(finish(iteration, CompletionReason::CompletionMarker, true, sink));
                        }
                    }
                }
            };

            if let Some(outcome) = round_outcome {
                return Ok(outcome);
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
#[path = "sse_tests.rs"]
mod tests;
