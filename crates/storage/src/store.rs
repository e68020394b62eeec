// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),
}

/// Optional durability layer (spec 6). Every call is best-effort: callers
/// log failures via `tracing::warn!` at the call boundary and never
/// propagate them as a `Result` the Coordinator has to react to (spec 7's
/// `persistence_error` policy is "log-only; never user-visible, never
/// aborts") — the `Result` here exists only so an implementation has
/// somewhere to put the failure for that logging, not so callers branch
/// on it.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Records a newly created sandbox. Returns this store's own id for it,
    /// or `None` if the store chooses not to assign one (e.g. [`NullStore`]).
    async fn create_sandbox(
        &self,
        user: &str,
        sandbox_id: &str,
        provider: &str,
        repo_url: &str,
    ) -> Result<Option<String>, PersistenceError>;

    /// Records the discovered agent server URL for a previously created
    /// sandbox.
    async fn attach_url(&self, db_id: &str, url: &str) -> Result<(), PersistenceError>;

    /// Records a new iteration run ("ralph") against a sandbox. Returns
    /// this store's own id for it, or `None`.
    async fn create_ralph(
        &self,
        user: &str,
        db_sandbox_id: &str,
        task: &str,
    ) -> Result<Option<String>, PersistenceError>;

    /// Appends one agent event's kind and opaque payload.
    async fn add_agent_event(
        &self,
        db_ralph_id: &str,
        kind: &str,
        data: &serde_json::Value,
    ) -> Result<(), PersistenceError>;

    /// Records a status transition, and the iteration count if known.
    async fn update_ralph_status(
        &self,
        db_ralph_id: &str,
        status: &str,
        iterations: Option<u32>,
    ) -> Result<(), PersistenceError>;
}
