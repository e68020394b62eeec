//! Testable Property 9: stopping a run cancels every non-terminal provider
//! fiber, waits for them to settle, and tears down their sandboxes exactly
//! once — the stop response and the run's own terminal snapshot agree.

use std::time::Duration;

use fleet_adapters::fake_agent_server::ChatBehavior;
use fleet_core::{ProviderStatus, RunStatus};

use super::support::{coordinator_with, validated_request, wait_until_terminal, wire_provider};

#[tokio::test]
async fn stop_cancels_an_in_flight_run_and_destroys_its_sandbox() {
    let wired = vec![wire_provider(fleet_core::Provider::Docker, ChatBehavior::Hang).await];
    let (coordinator, _persistence) = coordinator_with(&wired, Duration::from_secs(2));

    let response = coordinator.start_run(validated_request(vec![fleet_core::Provider::Docker], 50, 60_000, true));
    assert!(response.providers[0].success);

    // The agent's first chat call hangs forever, so once it has been made
    // at least once the run is parked in the iteration phase, not prep.
    for _ in 0..200 {
        if wired[0].agent_server.call_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(wired[0].agent_server.call_count() > 0, "run never reached the iteration phase");

    let stop = coordinator.stop_run(&response.run_id).await.unwrap();
    assert!(stop.success);
    assert_eq!(stop.providers.len(), 1);
    assert!(stop.providers[0].destroyed);

    let snapshot = wait_until_terminal(&coordinator, &response.run_id, 500).await;
    assert_eq!(snapshot.status, RunStatus::Failed);
    let provider = &snapshot.providers[0];
    assert_eq!(provider.status, ProviderStatus::Failed);
    assert_eq!(provider.failure_reason.as_deref(), Some("aborted during iteration"));
}

#[tokio::test]
async fn stop_on_an_already_terminal_run_is_a_success_no_op() {
    let wired = vec![wire_provider(fleet_core::Provider::Docker, ChatBehavior::EchoMarkerOverEvents { complete_at: 1 }).await];
    let (coordinator, _persistence) = coordinator_with(&wired, Duration::from_secs(2));

    let response = coordinator.start_run(validated_request(vec![fleet_core::Provider::Docker], 5, 5_000, true));
    wait_until_terminal(&coordinator, &response.run_id, 500).await;

    let stop = coordinator.stop_run(&response.run_id).await.unwrap();
    assert!(stop.success);
    // Already destroyed during normal teardown, not as a side effect of stop.
    assert!(stop.providers[0].destroyed);
}
