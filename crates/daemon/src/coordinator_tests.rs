// SPDX-License-Identifier: MIT

use super::*;
use fleet_adapters::fake_driver::FakeDriver;
use fleet_storage::MemoryStore;
use std::collections::HashMap as StdHashMap;
use std::sync::Arc;

fn coordinator_with_fake_docker() -> Coordinator {
    let fake: Arc<dyn fleet_adapters::gateway::SandboxDriver> = Arc::new(FakeDriver::new());
    let mut drivers = StdHashMap::new();
    drivers.insert(Provider::Docker, fake);
    let gateway = DriverGateway::new(drivers, Default::default());
    Coordinator::new(CoordinatorConfig {
        gateway,
        pipeline_config: PipelineConfig::default(),
        persistence: Arc::new(MemoryStore::new()),
        drain_timeout: Duration::from_millis(200),
    })
}

fn validated_request(providers: Vec<Provider>) -> ValidatedRunRequest {
    ValidatedRunRequest {
        repo: RepoLocation { owner: "foo".into(), repo: "bar".into() },
        branch: None,
        task: "fix the bug".into(),
        providers,
        max_iterations: 3,
        idle_timeout_ms: 60_000,
        use_sse: true,
        user_id: None,
    }
}

async fn wait_until_terminal(coordinator: &Coordinator, run_id: &RunId) -> RunSnapshot {
    for _ in 0..200 {
        let snapshot = coordinator.get_run(run_id).unwrap();
        if snapshot.providers.iter().all(|p| matches!(p.status, ProviderStatus::Completed | ProviderStatus::Failed)) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run did not reach a terminal state in time");
}

#[tokio::test]
async fn unknown_run_id_is_not_found() {
    let coordinator = coordinator_with_fake_docker();
    let err = coordinator.get_run(&RunId::new()).unwrap_err();
    assert!(matches!(err, CoordinatorError::RunNotFound));
}

#[tokio::test]
async fn providers_reports_configured_and_unconfigured() {
    let coordinator = coordinator_with_fake_docker();
    let response = coordinator.providers();
    let docker = response.providers.iter().find(|p| p.provider == Provider::Docker).unwrap();
    let modal = response.providers.iter().find(|p| p.provider == Provider::Modal).unwrap();
    assert!(docker.configured);
    assert!(!modal.configured);
}

#[tokio::test]
async fn run_with_fake_driver_fails_when_agent_url_is_unresolvable() {
    let coordinator = coordinator_with_fake_docker();
    let response = coordinator.start_run(validated_request(vec![Provider::Docker]));
    assert!(response.providers[0].success);

    let snapshot = wait_until_terminal(&coordinator, &response.run_id).await;
    assert_eq!(snapshot.status, fleet_core::RunStatus::Failed);
    let provider = &snapshot.providers[0];
    assert_eq!(provider.status, ProviderStatus::Failed);
    assert!(provider.failure_reason.as_deref().unwrap_or_default().contains("agent server url"));
    assert!(snapshot.ended_at_ms.is_some());
}

#[tokio::test]
async fn stream_replays_history_then_delivers_nothing_further_once_terminal() {
    let coordinator = coordinator_with_fake_docker();
    let response = coordinator.start_run(validated_request(vec![Provider::Docker]));
    wait_until_terminal(&coordinator, &response.run_id).await;

    let mut handle = coordinator.stream_run(&response.run_id).unwrap();
    assert!(!handle.replay.is_empty());
    assert!(handle.rx.try_recv().is_err());
}

#[tokio::test]
async fn stop_run_on_unknown_id_is_not_found() {
    let coordinator = coordinator_with_fake_docker();
    let err = coordinator.stop_run(&RunId::new()).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::RunNotFound));
}

#[tokio::test]
async fn stop_run_on_already_terminal_run_reports_success() {
    let coordinator = coordinator_with_fake_docker();
    let response = coordinator.start_run(validated_request(vec![Provider::Docker]));
    wait_until_terminal(&coordinator, &response.run_id).await;

    let stop = coordinator.stop_run(&response.run_id).await.unwrap();
    assert!(stop.success);
    assert_eq!(stop.providers.len(), 1);
}
