//! Testable Property 8: an agent that never responds and never emits a
//! progress event fails the provider once the idle timeout elapses, with
//! the failure reason naming `idle_timeout` specifically (not a generic
//! error), and long before `maxIterations` could ever be hit.

use std::time::Duration;

use fleet_adapters::fake_agent_server::ChatBehavior;
use fleet_core::{Provider, ProviderStatus, RunStatus};

use super::support::{coordinator_with, validated_request, wait_until_terminal, wire_provider};

#[tokio::test]
async fn idle_agent_fails_the_provider_with_idle_timeout_reason() {
    let wired = vec![wire_provider(Provider::Docker, ChatBehavior::Hang).await];
    let (coordinator, _persistence) = coordinator_with(&wired, Duration::from_secs(2));

    // maxIterations is generous — only the idle timeout should fire here.
    let response = coordinator.start_run(validated_request(vec![Provider::Docker], 50, 100, true));
    assert!(response.providers[0].success);

    let snapshot = wait_until_terminal(&coordinator, &response.run_id, 500).await;
    assert_eq!(snapshot.status, RunStatus::Failed);

    let provider = &snapshot.providers[0];
    assert_eq!(provider.status, ProviderStatus::Failed);
    assert_eq!(provider.failure_reason.as_deref(), Some("iteration ended: idle_timeout"));
}
