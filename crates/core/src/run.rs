// SPDX-License-Identifier: MIT

//! A top-level execution spanning all requested providers.

use crate::provider::Provider;
use crate::provider_run::{ProviderRunState, ProviderStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Identifier for a run. Generated from a time component plus
    /// randomness (the nanoid suffix), guaranteeing uniqueness without a
    /// shared counter.
    pub struct RunId("run-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

crate::simple_display! {
    RunStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// A single user-initiated orchestration instance.
///
/// Mutated by exactly one Coordinator-owned writer; per-provider writes are
/// serialized by ownership of that provider's slot (its pipeline/iteration
/// fiber). Frozen once every per-provider state is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub repo: String,
    pub branch: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub providers: HashMap<Provider, ProviderRunState>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at_ms: Option<u64>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RunError {
    #[error("a run must request at least one provider")]
    EmptyProviderSet,
}

impl Run {
    /// `DEFAULT_BRANCH` mirrors spec 3's stated default.
    pub const DEFAULT_BRANCH: &'static str = "main";

    pub fn new(
        repo: String,
        branch: Option<String>,
        task: String,
        providers: &[Provider],
        started_at_ms: u64,
        user_id: Option<String>,
        workspace_root: impl Fn(Provider) -> std::path::PathBuf,
    ) -> Result<Self, RunError> {
        if providers.is_empty() {
            return Err(RunError::EmptyProviderSet);
        }
        let mut map = HashMap::with_capacity(providers.len());
        for &p in providers {
            map.insert(p, ProviderRunState::new(p, workspace_root(p)));
        }
        Ok(Self {
            id: RunId::new(),
            repo,
            branch: branch.unwrap_or_else(|| Self::DEFAULT_BRANCH.to_string()),
            task,
            user_id,
            providers: map,
            started_at_ms,
            ended_at_ms: None,
        })
    }

    /// Aggregate status per spec 3/4.6: `running` while any provider is
    /// non-terminal, else `completed` if at least one succeeded, else
    /// `failed`.
    pub fn status(&self) -> RunStatus {
        if self.providers.values().any(|p| !p.status.is_terminal()) {
            return RunStatus::Running;
        }
        if self.providers.values().any(|p| p.status == ProviderStatus::Completed) {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.providers.values().all(|p| p.status.is_terminal())
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
