//! Scenario S5 / Testable Property 10: a run spanning two providers where
//! one has no configured driver at all fails that provider at preparation
//! while the other proceeds to completion — and the run's aggregate
//! status is `completed`, because at least one provider succeeded.

use std::time::Duration;

use fleet_adapters::fake_agent_server::ChatBehavior;
use fleet_core::{Provider, ProviderStatus, RunStatus};

use super::support::{coordinator_with, validated_request, wait_until_terminal, wire_provider};

#[tokio::test]
async fn one_unconfigured_provider_fails_without_sinking_the_run() {
    let wired = vec![wire_provider(Provider::Docker, ChatBehavior::EchoMarkerOverEvents { complete_at: 1 }).await];
    // Modal is requested but never registered with the gateway.
    let (coordinator, _persistence) = coordinator_with(&wired, Duration::from_secs(2));

    let response = coordinator.start_run(validated_request(vec![Provider::Docker, Provider::Modal], 5, 5_000, true));
    assert!(response.providers.iter().all(|p| p.success));

    let snapshot = wait_until_terminal(&coordinator, &response.run_id, 500).await;
    assert_eq!(snapshot.status, RunStatus::Completed);

    let docker = snapshot.providers.iter().find(|p| p.provider == Provider::Docker).unwrap();
    assert_eq!(docker.status, ProviderStatus::Completed);

    let modal = snapshot.providers.iter().find(|p| p.provider == Provider::Modal).unwrap();
    assert_eq!(modal.status, ProviderStatus::Failed);
    assert!(modal.failure_reason.as_deref().unwrap_or_default().contains("no driver configured"));
    assert!(modal.sandbox_id.is_none());
}
