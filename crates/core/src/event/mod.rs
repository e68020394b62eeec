// SPDX-License-Identifier: MIT

//! Event envelope and per-kind payloads for the unified event stream.
//!
//! Serializes with `{"id", "type", "ts", "provider", "data"}` framing per
//! spec 6 — the envelope is fixed, `data` is a tagged variant per kind so
//! subscribers never have to stringly-type their way into a payload.

mod data;

pub use data::{CompletionReason, EventData, ToolCallState};

use crate::provider::Provider;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an event, stable within a run.
    pub struct AgentEventId("evt-");
}

/// An envelope carrying one [`EventData`] payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: AgentEventId,
    pub ts_ms: u64,
    pub provider: Provider,
    pub data: EventData,
}

impl AgentEvent {
    pub fn new(ts_ms: u64, provider: Provider, data: EventData) -> Self {
        Self { id: AgentEventId::new(), ts_ms, provider, data }
    }

    /// The event kind tag as used on the wire (`"status"`, `"tool_call"`, ...).
    pub fn kind(&self) -> &'static str {
        self.data.kind()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
