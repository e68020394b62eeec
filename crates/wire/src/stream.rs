// SPDX-License-Identifier: MIT

//! Event stream framing (spec 6): each event delivered as
//! `{id, type, timestamp, provider, data}`; heartbeats use type `ping` and
//! are never reflected into history.

use fleet_core::{AgentEvent, Provider};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamFrame {
    pub id: String,
    #[serde(rename = "type")]
    pub frame_type: String,
    pub timestamp: u64,
    pub provider: Provider,
    pub data: serde_json::Value,
}

impl StreamFrame {
    pub fn from_event(event: &AgentEvent) -> Self {
        Self {
            id: event.id.as_str().to_string(),
            frame_type: event.kind().to_string(),
            timestamp: event.ts_ms,
            provider: event.provider,
            data: serde_json::to_value(&event.data).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Out-of-band keep-alive frame. Never stored in the bus's history.
    pub fn ping(provider: Provider, timestamp: u64) -> Self {
        Self {
            id: String::new(),
            frame_type: "ping".to_string(),
            timestamp,
            provider,
            data: serde_json::Value::Null,
        }
    }

    pub fn is_ping(&self) -> bool {
        self.frame_type == "ping"
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
