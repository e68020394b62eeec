//! Scenario S1: a single-provider run whose agent reports completion on
//! its first turn succeeds end-to-end, destroys its sandbox, and its event
//! history carries the expected shape (Testable Properties 1, 9, 10).

use std::time::Duration;

use fleet_adapters::fake_agent_server::ChatBehavior;
use fleet_adapters::gateway::{SandboxDriver, SandboxHandle};
use fleet_core::{EventData, Provider, ProviderStatus, RunStatus};

use super::support::{coordinator_with, validated_request, wait_until_terminal, wire_provider};

#[tokio::test]
async fn sse_engine_completes_on_first_turn_and_tears_down() {
    let wired = vec![wire_provider(Provider::Docker, ChatBehavior::EchoMarkerOverEvents { complete_at: 1 }).await];
    let (coordinator, _persistence) = coordinator_with(&wired, Duration::from_secs(2));

    let response = coordinator.start_run(validated_request(vec![Provider::Docker], 5, 5_000, true));
    assert!(response.providers[0].success);

    let snapshot = wait_until_terminal(&coordinator, &response.run_id, 500).await;
    assert_eq!(snapshot.status, RunStatus::Completed);

    let provider = snapshot.providers.iter().find(|p| p.provider == Provider::Docker).unwrap();
    assert_eq!(provider.status, ProviderStatus::Completed);
    assert!(provider.sandbox_id.is_some());
    assert!(provider.event_count > 0);
    assert!(snapshot.ended_at_ms.is_some());

    let handle = SandboxHandle { sandbox_id: provider.sandbox_id.clone().unwrap() };
    assert_eq!(wired[0].driver.status(&handle).await.unwrap(), "destroyed");
}

#[tokio::test]
async fn blocking_engine_completes_on_configured_turn() {
    let wired = vec![wire_provider(Provider::Docker, ChatBehavior::EchoMarkerInChat { complete_at: 2 }).await];
    let (coordinator, _persistence) = coordinator_with(&wired, Duration::from_secs(2));

    let response = coordinator.start_run(validated_request(vec![Provider::Docker], 5, 60_000, false));
    let snapshot = wait_until_terminal(&coordinator, &response.run_id, 500).await;

    assert_eq!(snapshot.status, RunStatus::Completed);
    let provider = &snapshot.providers[0];
    assert_eq!(provider.status, ProviderStatus::Completed);
}

#[tokio::test]
async fn late_subscriber_sees_full_replay_of_a_completed_run() {
    let wired = vec![wire_provider(Provider::Docker, ChatBehavior::EchoMarkerOverEvents { complete_at: 1 }).await];
    let (coordinator, _persistence) = coordinator_with(&wired, Duration::from_secs(2));

    let response = coordinator.start_run(validated_request(vec![Provider::Docker], 5, 5_000, true));
    wait_until_terminal(&coordinator, &response.run_id, 500).await;

    let mut handle = coordinator.stream_run(&response.run_id).unwrap();
    assert!(!handle.replay.is_empty());
    assert!(handle.replay.iter().any(|e| matches!(e.data, EventData::Complete { .. })));
    // Nothing further is delivered once the run is terminal.
    assert!(handle.rx.try_recv().is_err());
}
