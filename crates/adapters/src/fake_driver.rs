// SPDX-License-Identifier: MIT

//! In-memory `SandboxDriver` test double, gated behind `test-support` so
//! `fleet-engine`/`fleet-daemon` can exercise the Preparation Pipeline and
//! Iteration Engine without a real provider.

use crate::gateway::{DriverError, ExecOptions, ExecResult, SandboxDriver, SandboxHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Sandbox {
    files: HashMap<String, Vec<u8>>,
    destroyed: bool,
}

/// Records every command passed to `run` so tests can assert on the
/// Preparation Pipeline's command sequence without a live sandbox.
#[derive(Default)]
pub struct FakeDriver {
    next_id: AtomicU64,
    sandboxes: Mutex<HashMap<String, Sandbox>>,
    commands: Mutex<Vec<String>>,
    fail_run_matching: Mutex<Option<String>>,
    process_urls: Mutex<HashMap<u16, String>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands_run(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Makes `get_process_urls` resolve `port` to `url` instead of the
    /// default `CapabilityUnsupported`, so tests can point the Preparation
    /// Pipeline at a real (test-local) agent server.
    pub fn set_process_url(&self, port: u16, url: impl Into<String>) {
        self.process_urls.lock().insert(port, url.into());
    }

    /// Subsequent `run` calls whose command contains `needle` return an error.
    pub fn fail_commands_containing(&self, needle: impl Into<String>) {
        *self.fail_run_matching.lock() = Some(needle.into());
    }
}

#[async_trait]
impl SandboxDriver for FakeDriver {
    async fn create(&self, _base_image: &str) -> Result<SandboxHandle, DriverError> {
        let id = format!("fake-sbx-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sandboxes.lock().insert(id.clone(), Sandbox::default());
        Ok(SandboxHandle { sandbox_id: id })
    }

    async fn destroy(&self, sandbox: &SandboxHandle) -> Result<(), DriverError> {
        let mut sandboxes = self.sandboxes.lock();
        let s = sandboxes
            .get_mut(&sandbox.sandbox_id)
            .ok_or_else(|| DriverError::NotFound(sandbox.sandbox_id.clone()))?;
        s.destroyed = true;
        Ok(())
    }

    async fn status(&self, sandbox: &SandboxHandle) -> Result<String, DriverError> {
        let sandboxes = self.sandboxes.lock();
        let s = sandboxes
            .get(&sandbox.sandbox_id)
            .ok_or_else(|| DriverError::NotFound(sandbox.sandbox_id.clone()))?;
        Ok(if s.destroyed { "destroyed".into() } else { "running".into() })
    }

    async fn run(&self, sandbox: &SandboxHandle, cmd: &str, _opts: ExecOptions) -> Result<ExecResult, DriverError> {
        if !self.sandboxes.lock().contains_key(&sandbox.sandbox_id) {
            return Err(DriverError::NotFound(sandbox.sandbox_id.clone()));
        }
        self.commands.lock().push(cmd.to_string());
        if let Some(needle) = self.fail_run_matching.lock().as_ref() {
            if cmd.contains(needle.as_str()) {
                return Ok(ExecResult { exit_code: 1, stdout: String::new(), stderr: format!("simulated failure: {cmd}") });
            }
        }
        Ok(ExecResult { exit_code: 0, stdout: String::new(), stderr: String::new() })
    }

    async fn read_file(&self, sandbox: &SandboxHandle, path: &str) -> Result<Vec<u8>, DriverError> {
        let sandboxes = self.sandboxes.lock();
        let s = sandboxes
            .get(&sandbox.sandbox_id)
            .ok_or_else(|| DriverError::NotFound(sandbox.sandbox_id.clone()))?;
        s.files.get(path).cloned().ok_or_else(|| DriverError::NotFound(path.to_string()))
    }

    async fn write_file(&self, sandbox: &SandboxHandle, path: &str, contents: &[u8]) -> Result<(), DriverError> {
        let mut sandboxes = self.sandboxes.lock();
        let s = sandboxes
            .get_mut(&sandbox.sandbox_id)
            .ok_or_else(|| DriverError::NotFound(sandbox.sandbox_id.clone()))?;
        s.files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn list_dir(&self, sandbox: &SandboxHandle, path: &str) -> Result<Vec<String>, DriverError> {
        let sandboxes = self.sandboxes.lock();
        let s = sandboxes
            .get(&sandbox.sandbox_id)
            .ok_or_else(|| DriverError::NotFound(sandbox.sandbox_id.clone()))?;
        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(s.files.keys().filter(|k| k.starts_with(&prefix)).cloned().collect())
    }

    async fn mkdir(&self, sandbox: &SandboxHandle, _path: &str) -> Result<(), DriverError> {
        if !self.sandboxes.lock().contains_key(&sandbox.sandbox_id) {
            return Err(DriverError::NotFound(sandbox.sandbox_id.clone()));
        }
        Ok(())
    }

    async fn rm(&self, sandbox: &SandboxHandle, path: &str) -> Result<(), DriverError> {
        let mut sandboxes = self.sandboxes.lock();
        let s = sandboxes
            .get_mut(&sandbox.sandbox_id)
            .ok_or_else(|| DriverError::NotFound(sandbox.sandbox_id.clone()))?;
        s.files.remove(path);
        Ok(())
    }

    async fn get_process_urls(
        &self,
        sandbox: &SandboxHandle,
        ports: &[u16],
    ) -> Result<HashMap<u16, String>, DriverError> {
        if !self.sandboxes.lock().contains_key(&sandbox.sandbox_id) {
            return Err(DriverError::NotFound(sandbox.sandbox_id.clone()));
        }
        let configured = self.process_urls.lock();
        if configured.is_empty() {
            return Err(DriverError::CapabilityUnsupported("get_process_urls"));
        }
        Ok(ports.iter().filter_map(|p| configured.get(p).map(|url| (*p, url.clone()))).collect())
    }
}

pub fn fake_driver() -> Arc<dyn SandboxDriver> {
    Arc::new(FakeDriver::new())
}

#[cfg(test)]
#[path = "fake_driver_tests.rs"]
mod tests;
