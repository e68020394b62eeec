// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::store::{PersistenceError, PersistenceStore};

#[derive(Debug, Clone)]
pub struct SandboxRecord {
    pub user: String,
    pub sandbox_id: String,
    pub provider: String,
    pub repo_url: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RalphRecord {
    pub user: String,
    pub db_sandbox_id: String,
    pub task: String,
    pub status: String,
    pub iterations: Option<u32>,
    pub events: Vec<(String, serde_json::Value)>,
}

/// In-memory [`PersistenceStore`] test double: assigns sequential ids and
/// records everything written, so tests can assert on what the Coordinator
/// actually persisted. Modeled on the teacher's in-memory fakes for its own
/// `oj-storage::state` tables, scoped to this crate's five operations.
#[derive(Default)]
pub struct MemoryStore {
    sandboxes: Mutex<HashMap<String, SandboxRecord>>,
    ralphs: Mutex<HashMap<String, RalphRecord>>,
    next_id: Mutex<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let mut next = self.next_id.lock();
        *next += 1;
        format!("{prefix}-{next}")
    }

    pub fn sandbox(&self, db_id: &str) -> Option<SandboxRecord> {
        self.sandboxes.lock().get(db_id).cloned()
    }

    pub fn ralph(&self, db_id: &str) -> Option<RalphRecord> {
        self.ralphs.lock().get(db_id).cloned()
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn create_sandbox(
        &self,
        user: &str,
        sandbox_id: &str,
        provider: &str,
        repo_url: &str,
    ) -> Result<Option<String>, PersistenceError> {
        let id = self.fresh_id("sbx");
        self.sandboxes.lock().insert(
            id.clone(),
            SandboxRecord {
                user: user.to_string(),
                sandbox_id: sandbox_id.to_string(),
                provider: provider.to_string(),
                repo_url: repo_url.to_string(),
                url: None,
            },
        );
        Ok(Some(id))
    }

    async fn attach_url(&self, db_id: &str, url: &str) -> Result<(), PersistenceError> {
        if let Some(record) = self.sandboxes.lock().get_mut(db_id) {
            record.url = Some(url.to_string());
        }
        Ok(())
    }

    async fn create_ralph(
        &self,
        user: &str,
        db_sandbox_id: &str,
        task: &str,
    ) -> Result<Option<String>, PersistenceError> {
        let id = self.fresh_id("ralph");
        self.ralphs.lock().insert(
            id.clone(),
            RalphRecord {
                user: user.to_string(),
                db_sandbox_id: db_sandbox_id.to_string(),
                task: task.to_string(),
                status: "idle".to_string(),
                iterations: None,
                events: Vec::new(),
            },
        );
        Ok(Some(id))
    }

    async fn add_agent_event(
        &self,
        db_ralph_id: &str,
        kind: &str,
        data: &serde_json::Value,
    ) -> Result<(), PersistenceError> {
        if let Some(record) = self.ralphs.lock().get_mut(db_ralph_id) {
            record.events.push((kind.to_string(), data.clone()));
        }
        Ok(())
    }

    async fn update_ralph_status(
        &self,
        db_ralph_id: &str,
        status: &str,
        iterations: Option<u32>,
    ) -> Result<(), PersistenceError> {
        if let Some(record) = self.ralphs.lock().get_mut(db_ralph_id) {
            record.status = status.to_string();
            if iterations.is_some() {
                record.iterations = iterations;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
