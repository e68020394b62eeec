// SPDX-License-Identifier: MIT

//! Driver Gateway: resolves `(provider, operation)` to the configured
//! `SandboxDriver`. No logic of its own beyond dispatch (spec 4.2).

use async_trait::async_trait;
use fleet_core::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("driver unavailable: {0}")]
    Unavailable(String),
    #[error("capability not supported by this driver: {0}")]
    CapabilityUnsupported(&'static str),
    #[error("sandbox not found: {0}")]
    NotFound(String),
    #[error("driver error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct SandboxHandle {
    pub sandbox_id: String,
}

#[derive(Debug, Clone)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub cwd: Option<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    /// Run detached in the background (used to start the agent server).
    pub background: bool,
}

/// A provider-specific adapter translating generic operations into one
/// provider's sandbox API.
///
/// Drivers are external collaborators (spec 1) — only the trait and a test
/// double ([`crate::fake_driver::FakeDriver`]) are implemented here; real
/// provider wiring (Modal/Docker/Daytona/E2B/Morph APIs) is out of scope.
#[async_trait]
pub trait SandboxDriver: Send + Sync {
    async fn create(&self, base_image: &str) -> Result<SandboxHandle, DriverError>;
    async fn destroy(&self, sandbox: &SandboxHandle) -> Result<(), DriverError>;
    async fn status(&self, sandbox: &SandboxHandle) -> Result<String, DriverError>;
    async fn run(&self, sandbox: &SandboxHandle, cmd: &str, opts: ExecOptions) -> Result<ExecResult, DriverError>;
    async fn read_file(&self, sandbox: &SandboxHandle, path: &str) -> Result<Vec<u8>, DriverError>;
    async fn write_file(&self, sandbox: &SandboxHandle, path: &str, contents: &[u8]) -> Result<(), DriverError>;
    async fn list_dir(&self, sandbox: &SandboxHandle, path: &str) -> Result<Vec<String>, DriverError>;
    async fn mkdir(&self, sandbox: &SandboxHandle, path: &str) -> Result<(), DriverError>;
    async fn rm(&self, sandbox: &SandboxHandle, path: &str) -> Result<(), DriverError>;

    /// Map exposed ports to public URLs. Optional capability — the default
    /// implementation degrades gracefully per spec 7's
    /// `capability_unsupported` policy ("fall back to empty URL map").
    async fn get_process_urls(
        &self,
        _sandbox: &SandboxHandle,
        _ports: &[u16],
    ) -> Result<HashMap<u16, String>, DriverError> {
        Err(DriverError::CapabilityUnsupported("get_process_urls"))
    }

    /// Optional capability for providers that can execute code snippets
    /// directly rather than via `run`.
    async fn run_code(&self, _sandbox: &SandboxHandle, _code: &str) -> Result<ExecResult, DriverError> {
        Err(DriverError::CapabilityUnsupported("run_code"))
    }
}

#[derive(Clone, Default)]
pub struct GatewayConfig {
    pub op_timeout: Option<Duration>,
}

/// Holds one driver handle per provider, constructed once at process start.
///
/// Grounded in `RuntimeRouter`'s provider-dispatch-by-lookup (teacher's
/// `oj-daemon::adapters::agent::router`), generalized from a two-route
/// local/Docker switch to an N-provider map.
#[derive(Clone)]
pub struct DriverGateway {
    drivers: Arc<HashMap<Provider, Arc<dyn SandboxDriver>>>,
    config: GatewayConfig,
}

impl DriverGateway {
    pub fn new(drivers: HashMap<Provider, Arc<dyn SandboxDriver>>, config: GatewayConfig) -> Self {
        Self { drivers: Arc::new(drivers), config }
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.drivers.contains_key(&provider)
    }

    pub fn driver(&self, provider: Provider) -> Result<&Arc<dyn SandboxDriver>, DriverError> {
        self.drivers
            .get(&provider)
            .ok_or_else(|| DriverError::Unavailable(format!("no driver configured for {provider}")))
    }

    pub fn op_timeout(&self) -> Option<Duration> {
        self.config.op_timeout
    }

    pub fn configured_providers(&self) -> Vec<Provider> {
        let mut v: Vec<_> = self.drivers.keys().copied().collect();
        v.sort();
        v
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
