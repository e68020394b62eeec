//! Testable Property 7: a run that never emits the completion marker
//! terminates after exactly `maxIterations` turns with reason
//! `max_iterations`, rather than running forever.

use std::time::Duration;

use fleet_adapters::fake_agent_server::ChatBehavior;
use fleet_core::{Provider, ProviderStatus, RunStatus};

use super::support::{coordinator_with, validated_request, wait_until_terminal, wire_provider};

#[tokio::test]
async fn run_without_a_marker_stops_at_max_iterations() {
    let wired = vec![wire_provider(Provider::Docker, ChatBehavior::Ack).await];
    let (coordinator, _persistence) = coordinator_with(&wired, Duration::from_secs(2));

    let response = coordinator.start_run(validated_request(vec![Provider::Docker], 3, 5_000, true));
    let snapshot = wait_until_terminal(&coordinator, &response.run_id, 500).await;

    assert_eq!(snapshot.status, RunStatus::Failed);
    let provider = &snapshot.providers[0];
    assert_eq!(provider.status, ProviderStatus::Failed);
    assert_eq!(provider.failure_reason.as_deref(), Some("iteration ended: max_iterations"));

    // Exactly 3 `RalphIteration` progress events, one per configured turn.
    let iterations = wired[0].agent_server.call_count();
    assert_eq!(iterations, 3);
}
