// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::store::{PersistenceError, PersistenceStore};

/// The default store when none is configured: every write is a no-op,
/// every id-returning call answers `None`. Lets the Coordinator call the
/// same [`PersistenceStore`] interface unconditionally instead of
/// branching on "is persistence configured".
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl PersistenceStore for NullStore {
    async fn create_sandbox(
        &self,
        _user: &str,
        _sandbox_id: &str,
        _provider: &str,
        _repo_url: &str,
    ) -> Result<Option<String>, PersistenceError> {
        Ok(None)
    }

    async fn attach_url(&self, _db_id: &str, _url: &str) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn create_ralph(
        &self,
        _user: &str,
        _db_sandbox_id: &str,
        _task: &str,
    ) -> Result<Option<String>, PersistenceError> {
        Ok(None)
    }

    async fn add_agent_event(
        &self,
        _db_ralph_id: &str,
        _kind: &str,
        _data: &serde_json::Value,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn update_ralph_status(
        &self,
        _db_ralph_id: &str,
        _status: &str,
        _iterations: Option<u32>,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "null_tests.rs"]
mod tests;
