// SPDX-License-Identifier: MIT

use crate::provider_run::ProviderStatus;
use serde::{Deserialize, Serialize};

/// Reason an iteration loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    CompletionMarker,
    IdleTimeout,
    MaxIterations,
    Error,
    Aborted,
}

crate::simple_display! {
    CompletionReason {
        CompletionMarker => "completion_marker",
        IdleTimeout => "idle_timeout",
        MaxIterations => "max_iterations",
        Error => "error",
        Aborted => "aborted",
    }
}

/// State of a completed tool invocation, mirrored from the agent server's
/// `message.part.updated` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallState {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

/// Tagged per-kind event payload.
///
/// Kinds: `status`, `clone_progress`, `install_progress`, `output`, `error`,
/// `thought`, `tool_call`, `tool_result`, `complete`, `opencode_ready`,
/// `ralph_iteration`, `ralph_complete` (spec 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventData {
    #[serde(rename = "status")]
    Status {
        status: ProviderStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    #[serde(rename = "clone_progress")]
    CloneProgress { step: String, message: String },

    #[serde(rename = "install_progress")]
    InstallProgress { step: String, message: String },

    #[serde(rename = "output")]
    Output { text: String },

    #[serde(rename = "error")]
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },

    #[serde(rename = "thought")]
    Thought { text: String },

    #[serde(rename = "tool_call")]
    ToolCall {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        state: ToolCallState,
    },

    #[serde(rename = "tool_result")]
    ToolResult { name: String, result: serde_json::Value },

    #[serde(rename = "complete")]
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    #[serde(rename = "opencode_ready")]
    OpencodeReady { url: String },

    #[serde(rename = "ralph_iteration")]
    RalphIteration { iteration: u32, max_iterations: u32 },

    #[serde(rename = "ralph_complete")]
    RalphComplete { iterations: u32, reason: CompletionReason, success: bool },
}

impl EventData {
    pub fn kind(&self) -> &'static str {
        match self {
            EventData::Status { .. } => "status",
            EventData::CloneProgress { .. } => "clone_progress",
            EventData::InstallProgress { .. } => "install_progress",
            EventData::Output { .. } => "output",
            EventData::Error { .. } => "error",
            EventData::Thought { .. } => "thought",
            EventData::ToolCall { .. } => "tool_call",
            EventData::ToolResult { .. } => "tool_result",
            EventData::Complete { .. } => "complete",
            EventData::OpencodeReady { .. } => "opencode_ready",
            EventData::RalphIteration { .. } => "ralph_iteration",
            EventData::RalphComplete { .. } => "ralph_complete",
        }
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
