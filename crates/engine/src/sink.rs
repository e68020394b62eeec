// SPDX-License-Identifier: MIT

//! The narrow interface the Preparation Pipeline and Iteration Engine use
//! to report progress back to whatever owns a provider's
//! [`fleet_core::ProviderRunState`] — the Run Coordinator, in production.
//!
//! Kept as a trait (rather than handing the pipeline/engine a `&mut
//! ProviderRunState` directly) so `fleet-engine` never needs to know how
//! that state is synchronized — the Coordinator's single-writer-per-slot
//! discipline (spec 3) is its business, not the pipeline's.

use fleet_core::{AgentSessionId, EventData, IterationSessionId, ProviderStatus};

/// Per-provider callback surface. One implementation instance is bound to
/// exactly one `(run_id, provider)` slot.
pub trait ProviderSink: Send + Sync {
    /// Append an event to this provider's stream.
    fn emit(&self, data: EventData);

    /// Record a `ProviderRunState` status transition.
    fn set_status(&self, status: ProviderStatus);

    /// Record the sandbox id once creation succeeds.
    fn set_sandbox_id(&self, sandbox_id: String);

    /// Record the discovered agent server URL (or its absence).
    fn set_agent_server_url(&self, url: Option<String>);

    /// Record the agent server's own session id for the current iteration.
    fn set_agent_session(&self, session_id: Option<AgentSessionId>);

    /// Record the core-side iteration session id.
    fn set_iteration_session(&self, session_id: Option<IterationSessionId>);
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// Records every call made against it, for assertions in pipeline and
    /// iteration-engine tests.
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<EventData>>,
        pub statuses: Mutex<Vec<ProviderStatus>>,
        pub sandbox_id: Mutex<Option<String>>,
        pub agent_server_url: Mutex<Option<String>>,
        pub agent_session: Mutex<Option<AgentSessionId>>,
        pub iteration_session: Mutex<Option<IterationSessionId>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<EventData> {
            self.events.lock().clone()
        }

        pub fn statuses(&self) -> Vec<ProviderStatus> {
            self.statuses.lock().clone()
        }
    }

    impl ProviderSink for RecordingSink {
        fn emit(&self, data: EventData) {
            self.events.lock().push(data);
        }

        fn set_status(&self, status: ProviderStatus) {
            self.statuses.lock().push(status);
        }

        fn set_sandbox_id(&self, sandbox_id: String) {
            *self.sandbox_id.lock() = Some(sandbox_id);
        }

        fn set_agent_server_url(&self, url: Option<String>) {
            *self.agent_server_url.lock() = url;
        }

        fn set_agent_session(&self, session_id: Option<AgentSessionId>) {
            *self.agent_session.lock() = session_id;
        }

        fn set_iteration_session(&self, session_id: Option<IterationSessionId>) {
            *self.iteration_session.lock() = session_id;
        }
    }
}
