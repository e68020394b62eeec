//! Shared scaffolding for the scenario tests in this directory: wires a
//! [`Coordinator`] to one or more [`FakeDriver`]s, each pointed at its own
//! [`FakeAgentServer`], so a run can be driven through the Preparation
//! Pipeline and Iteration Engine to a real terminal outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fleet_adapters::fake_agent_server::{ChatBehavior, FakeAgentServer};
use fleet_adapters::fake_driver::FakeDriver;
use fleet_adapters::gateway::{DriverGateway, GatewayConfig, SandboxDriver};
use fleet_core::{Provider, RepoLocation, RunId, RunStatus};
use fleet_daemon::{Coordinator, CoordinatorConfig};
use fleet_engine::pipeline::{PipelineConfig, AGENT_PORT};
use fleet_storage::MemoryStore;
use fleet_wire::{RunSnapshot, ValidatedRunRequest};

/// One provider wired into a test [`Coordinator`]: its `FakeDriver` plus
/// the scripted agent server it was pointed at.
pub struct WiredProvider {
    pub provider: Provider,
    pub driver: Arc<FakeDriver>,
    pub agent_server: FakeAgentServer,
}

/// Spawns a fake agent server for `provider`, registers a fresh
/// [`FakeDriver`] pointed at it (so the Preparation Pipeline's
/// `get_process_urls` step resolves), and returns both.
pub async fn wire_provider(provider: Provider, behavior: ChatBehavior) -> WiredProvider {
    let agent_server = FakeAgentServer::spawn(behavior).await;
    let driver = Arc::new(FakeDriver::new());
    driver.set_process_url(AGENT_PORT, agent_server.base_url().to_string());
    WiredProvider { provider, driver, agent_server }
}

/// Builds a [`Coordinator`] whose `DriverGateway` only knows the given
/// wired providers — any provider requested but absent from this set fails
/// at preparation with `DriverError::Unavailable` (Scenario S5). Returns
/// the `MemoryStore` backing it too, so tests can assert on what got
/// persisted.
pub fn coordinator_with(wired: &[WiredProvider], drain_timeout: Duration) -> (Coordinator, Arc<MemoryStore>) {
    let mut drivers: HashMap<Provider, Arc<dyn SandboxDriver>> = HashMap::new();
    for w in wired {
        drivers.insert(w.provider, w.driver.clone() as Arc<dyn SandboxDriver>);
    }
    let gateway = DriverGateway::new(drivers, GatewayConfig::default());
    let persistence = Arc::new(MemoryStore::new());
    let coordinator = Coordinator::new(CoordinatorConfig {
        gateway,
        pipeline_config: PipelineConfig::default(),
        persistence: persistence.clone(),
        drain_timeout,
    });
    (coordinator, persistence)
}

pub fn validated_request(providers: Vec<Provider>, max_iterations: u32, idle_timeout_ms: u64, use_sse: bool) -> ValidatedRunRequest {
    ValidatedRunRequest {
        repo: RepoLocation { owner: "octocat".into(), repo: "hello-world".into() },
        branch: None,
        task: "fix the failing test".into(),
        providers,
        max_iterations,
        idle_timeout_ms,
        use_sse,
        user_id: Some("alice".into()),
    }
}

/// Polls `coordinator` until every provider in `run_id` reaches a terminal
/// status, or panics after `attempts * 20ms`.
pub async fn wait_until_terminal(coordinator: &Coordinator, run_id: &RunId, attempts: u32) -> RunSnapshot {
    for _ in 0..attempts {
        let snapshot = coordinator.get_run(run_id).expect("run exists");
        if snapshot.status != RunStatus::Running {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run did not reach a terminal state in time");
}
