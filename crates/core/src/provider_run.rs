// SPDX-License-Identifier: MIT

//! Per-provider run state — one slot per requested provider within a [`Run`].

use crate::provider::Provider;
use crate::session::{AgentSessionId, IterationSessionId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Identifier for one provider's slot within a run.
    pub struct ProviderRunId("prv-");
}

/// Status of a provider's slot. Transitions form a DAG:
/// `Idle -> Cloning -> Installing -> Running -> {Completed|Failed}`.
/// Any state may transition to `Failed`. `Paused` is reserved for future
/// suspension and is never entered by the current pipeline/engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Idle,
    Cloning,
    Installing,
    Running,
    Paused,
    Completed,
    Failed,
}

crate::simple_display! {
    ProviderStatus {
        Idle => "idle",
        Cloning => "cloning",
        Installing => "installing",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
    }
}

impl ProviderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProviderStatus::Completed | ProviderStatus::Failed)
    }

    /// Whether `self -> next` is an allowed DAG edge.
    pub fn can_transition_to(&self, next: ProviderStatus) -> bool {
        use ProviderStatus::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Idle, Cloning)
                | (Cloning, Installing)
                | (Installing, Running)
                | (Running, Completed)
                | (Running, Paused)
                | (Paused, Running)
        )
    }
}

/// Per-provider state owned exclusively by that provider's pipeline fiber
/// for writes; the Coordinator and Event Bus consumers only observe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRunState {
    pub id: ProviderRunId,
    pub provider: Provider,
    pub status: ProviderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_id: Option<String>,
    pub workspace_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_session_id: Option<AgentSessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_session_id: Option<IterationSessionId>,
    /// Monotonic count of events emitted for this provider so far.
    pub event_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ProviderRunState {
    pub fn new(provider: Provider, workspace_dir: PathBuf) -> Self {
        Self {
            id: ProviderRunId::new(),
            provider,
            status: ProviderStatus::Idle,
            sandbox_id: None,
            workspace_dir,
            agent_server_url: None,
            agent_session_id: None,
            iteration_session_id: None,
            event_count: 0,
            failure_reason: None,
        }
    }

    /// Attempt a status transition, returning whether it was applied.
    ///
    /// Invalid transitions are no-ops rather than panics — a pipeline step
    /// racing with a concurrent `stopRun` should not crash the fiber.
    pub fn transition(&mut self, next: ProviderStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = ProviderStatus::Failed;
        self.failure_reason = Some(reason.into());
    }
}

#[cfg(test)]
#[path = "provider_run_tests.rs"]
mod tests;
