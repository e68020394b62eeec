// SPDX-License-Identifier: MIT

//! `POST /run` request body and validation.

use fleet_core::{parse_repo_location, Provider, RepoLocation, RepoUrlError};
use serde::{Deserialize, Serialize};

/// Iteration-engine tuning, all optional with spec-mandated defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfigInput {
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
    /// Defaults to `true` — SSE is the primary iteration variant (spec 4.6/9).
    #[serde(default)]
    pub use_sse: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunRequest {
    pub repo_url: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub task: String,
    pub providers: Vec<String>,
    #[serde(default)]
    pub config: Option<RunConfigInput>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("repo_url: {0}")]
    RepoUrl(#[from] RepoUrlError),
    #[error("task must not be empty")]
    EmptyTask,
    #[error("providers must not be empty")]
    EmptyProviders,
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// Parsed, validated shape of a [`StartRunRequest`] — the only thing the
/// Coordinator ever sees (spec 7: `validation` failures never reach it).
#[derive(Debug, Clone)]
pub struct ValidatedRunRequest {
    pub repo: RepoLocation,
    pub branch: Option<String>,
    pub task: String,
    pub providers: Vec<Provider>,
    pub max_iterations: u32,
    pub idle_timeout_ms: u64,
    pub use_sse: bool,
    pub user_id: Option<String>,
}

pub const DEFAULT_MAX_ITERATIONS: u32 = 50;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 120_000;

impl StartRunRequest {
    pub fn validate(&self) -> Result<ValidatedRunRequest, ValidationError> {
        let repo = parse_repo_location(&self.repo_url)?;

        if self.task.trim().is_empty() {
            return Err(ValidationError::EmptyTask);
        }

        if self.providers.is_empty() {
            return Err(ValidationError::EmptyProviders);
        }
        let providers = self
            .providers
            .iter()
            .map(|s| s.parse::<Provider>().map_err(|_| ValidationError::UnknownProvider(s.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let config = self.config.clone().unwrap_or(RunConfigInput {
            max_iterations: None,
            idle_timeout_ms: None,
            use_sse: None,
        });

        Ok(ValidatedRunRequest {
            repo,
            branch: self.branch.clone(),
            task: self.task.clone(),
            providers,
            max_iterations: config.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            idle_timeout_ms: config.idle_timeout_ms.unwrap_or(DEFAULT_IDLE_TIMEOUT_MS),
            use_sse: config.use_sse.unwrap_or(true),
            user_id: self.user_id.clone(),
        })
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
