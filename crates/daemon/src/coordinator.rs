// SPDX-License-Identifier: MIT

//! The Run Coordinator (spec 3/4.1): owns every in-flight [`Run`], drives one
//! fiber per requested provider through the Preparation Pipeline and
//! Iteration Engine, and answers the Control API's four operations.
//!
//! Grounded in the teacher's single-writer-per-job discipline
//! (`oj-daemon`'s job-queue workers each own their job's mutable state
//! exclusively), generalized here to one fiber per `(run_id, provider)` slot
//! instead of one worker per queued job.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fleet_adapters::agent_client::AgentClient;
use fleet_adapters::gateway::DriverGateway;
use fleet_core::{
    Clock, EventData, Provider, ProviderStatus, RepoLocation, Run, RunId, SystemClock,
};
use fleet_engine::iteration::{IterationConfig, IterationCtx, IterationEngine, IterationOutcome, IterationError};
use fleet_engine::marker::generate_marker;
use fleet_engine::pipeline::{Pipeline, PipelineConfig, PipelineCtx, PreparedAgent};
use fleet_engine::sink::ProviderSink;
use fleet_engine::{BlockingChatEngine, SseIterationEngine};
use fleet_storage::PersistenceStore;
use fleet_wire::{
    ProviderEntry, ProviderSnapshot, ProviderStartResult, ProviderStopResult, ProvidersResponse,
    RunSnapshot, StartRunResponse, StopRunResponse, ValidatedRunRequest,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bus::{EventBus, SubscriberId};
use crate::error::CoordinatorError;

/// Tuning the Coordinator needs beyond what each run request supplies.
#[derive(Clone)]
pub struct CoordinatorConfig {
    pub gateway: DriverGateway,
    pub pipeline_config: PipelineConfig,
    pub persistence: Arc<dyn PersistenceStore>,
    /// How long `stopRun` waits for cancellation to settle before reporting
    /// providers as still-tearing-down (spec 5).
    pub drain_timeout: Duration,
}

struct CoordinatorInner {
    gateway: DriverGateway,
    pipeline_config: PipelineConfig,
    persistence: Arc<dyn PersistenceStore>,
    drain_timeout: Duration,
}

struct RunEntry {
    run: Mutex<Run>,
    bus: Arc<EventBus>,
    cancel_tokens: Mutex<HashMap<Provider, CancellationToken>>,
    destroyed: Mutex<HashMap<Provider, bool>>,
}

fn finalize_if_terminal(entry: &RunEntry) {
    let mut run = entry.run.lock();
    if run.is_terminal() && run.ended_at_ms.is_none() {
        run.ended_at_ms = Some(SystemClock.epoch_ms());
    }
}

fn fail_provider(entry: &RunEntry, provider: Provider, reason: impl Into<String>) {
    {
        let mut run = entry.run.lock();
        if let Some(state) = run.providers.get_mut(&provider) {
            state.fail(reason);
        }
    }
    finalize_if_terminal(entry);
}

/// Per-`(run, provider)` [`ProviderSink`], the only way the Preparation
/// Pipeline and Iteration Engine touch this run's state. Mirrors writes into
/// the run's `ProviderRunState` slot, fans events out over the run's
/// [`EventBus`], and mirrors events into the Persistence Store — best-effort
/// and asynchronous with respect to the publish itself (spec 4.1/7), except
/// for the sandbox/ralph records created directly by [`run_provider`], which
/// are awaited so `db_ralph_id` is available before the first event needs it.
struct CoordinatorSink {
    entry: Arc<RunEntry>,
    provider: Provider,
    persistence: Arc<dyn PersistenceStore>,
    db_ralph_id: Arc<Mutex<Option<String>>>,
}

impl ProviderSink for CoordinatorSink {
    fn emit(&self, data: EventData) {
        let ts_ms = SystemClock.epoch_ms();
        let event = fleet_core::AgentEvent::new(ts_ms, self.provider, data);

        {
            let mut run = self.entry.run.lock();
            if let Some(state) = run.providers.get_mut(&self.provider) {
                state.event_count += 1;
            }
        }
        self.entry.bus.publish(event.clone());

        if let Some(db_ralph_id) = self.db_ralph_id.lock().clone() {
            let persistence = self.persistence.clone();
            let kind = event.kind();
            let payload = serde_json::to_value(&event.data).unwrap_or(serde_json::Value::Null);
            tokio::spawn(async move {
                if let Err(err) = persistence.add_agent_event(&db_ralph_id, kind, &payload).await {
                    warn!(%err, "failed to persist agent event");
                }
            });
        }
    }

    fn set_status(&self, status: ProviderStatus) {
        let mut run = self.entry.run.lock();
        if let Some(state) = run.providers.get_mut(&self.provider) {
            state.transition(status);
        }
    }

    fn set_sandbox_id(&self, sandbox_id: String) {
        let mut run = self.entry.run.lock();
        if let Some(state) = run.providers.get_mut(&self.provider) {
            state.sandbox_id = Some(sandbox_id);
        }
    }

    fn set_agent_server_url(&self, url: Option<String>) {
        let mut run = self.entry.run.lock();
        if let Some(state) = run.providers.get_mut(&self.provider) {
            state.agent_server_url = url;
        }
    }

    fn set_agent_session(&self, session_id: Option<fleet_core::AgentSessionId>) {
        let mut run = self.entry.run.lock();
        if let Some(state) = run.providers.get_mut(&self.provider) {
            state.agent_session_id = session_id;
        }
    }

    fn set_iteration_session(&self, session_id: Option<fleet_core::IterationSessionId>) {
        let mut run = self.entry.run.lock();
        if let Some(state) = run.providers.get_mut(&self.provider) {
            state.iteration_session_id = session_id;
        }
    }
}

/// Handle to a live (or replayed) subscription on one run's event stream.
/// Unsubscribes from the bus automatically when dropped.
pub struct StreamHandle {
    bus: Arc<EventBus>,
    id: SubscriberId,
    pub replay: Vec<fleet_core::AgentEvent>,
    pub rx: tokio::sync::mpsc::UnboundedReceiver<fleet_core::AgentEvent>,
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

/// Owns every in-flight [`Run`] and the fiber set driving it (spec 3).
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
    runs: Arc<Mutex<HashMap<RunId, Arc<RunEntry>>>>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                gateway: config.gateway,
                pipeline_config: config.pipeline_config,
                persistence: config.persistence,
                drain_timeout: config.drain_timeout,
            }),
            runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn find(&self, run_id: &RunId) -> Result<Arc<RunEntry>, CoordinatorError> {
        self.runs.lock().get(run_id).cloned().ok_or(CoordinatorError::RunNotFound)
    }

    /// Creates the run and spawns one fiber per requested provider, then
    /// returns immediately — preparation and iteration both proceed
    /// asynchronously (spec 4.1: "the Coordinator does not block on
    /// either").
    pub fn start_run(&self, req: ValidatedRunRequest) -> StartRunResponse {
        let started_at_ms = SystemClock.epoch_ms();
        let repo_display = req.repo.to_string();
        let workspace_root = {
            let repo = req.repo.clone();
            move |_p: Provider| std::path::PathBuf::from(format!("/workspace/{}", repo.dir_name()))
        };

        #[allow(clippy::expect_used)]
        let run = Run::new(
            repo_display,
            req.branch.clone(),
            req.task.clone(),
            &req.providers,
            started_at_ms,
            req.user_id.clone(),
            workspace_root,
        )
        .expect("ValidatedRunRequest always carries a non-empty provider set");
        let run_id = run.id;
        let branch = run.branch.clone();

        let entry = Arc::new(RunEntry {
            run: Mutex::new(run),
            bus: Arc::new(EventBus::new()),
            cancel_tokens: Mutex::new(HashMap::new()),
            destroyed: Mutex::new(HashMap::new()),
        });

        let mut providers = Vec::with_capacity(req.providers.len());
        for &provider in &req.providers {
            let cancel = CancellationToken::new();
            entry.cancel_tokens.lock().insert(provider, cancel.clone());
            providers.push(ProviderStartResult { provider, sandbox_id: None, success: true, error: None });

            tokio::spawn(run_provider(RunProviderTask {
                inner: self.inner.clone(),
                entry: entry.clone(),
                provider,
                repo: req.repo.clone(),
                branch: branch.clone(),
                task: req.task.clone(),
                max_iterations: req.max_iterations,
                idle_timeout_ms: req.idle_timeout_ms,
                use_sse: req.use_sse,
                user_id: req.user_id.clone(),
                cancel,
            }));
        }

        self.runs.lock().insert(run_id, entry);
        StartRunResponse { run_id, providers }
    }

    pub fn get_run(&self, run_id: &RunId) -> Result<RunSnapshot, CoordinatorError> {
        let entry = self.find(run_id)?;
        let run = entry.run.lock();
        Ok(RunSnapshot {
            run_id: run.id,
            repo: run.repo.clone(),
            branch: run.branch.clone(),
            task: run.task.clone(),
            status: run.status(),
            providers: run
                .providers
                .values()
                .map(|p| ProviderSnapshot {
                    provider: p.provider,
                    status: p.status,
                    sandbox_id: p.sandbox_id.clone(),
                    agent_server_url: p.agent_server_url.clone(),
                    event_count: p.event_count,
                    failure_reason: p.failure_reason.clone(),
                })
                .collect(),
            started_at_ms: run.started_at_ms,
            ended_at_ms: run.ended_at_ms,
        })
    }

    /// Cancels every non-terminal provider fiber and waits up to
    /// [`CoordinatorConfig::drain_timeout`] for them to settle before
    /// reporting back (spec 5).
    pub async fn stop_run(&self, run_id: &RunId) -> Result<StopRunResponse, CoordinatorError> {
        let entry = self.find(run_id)?;
        let provider_ids: Vec<Provider> = entry.run.lock().providers.keys().copied().collect();

        for &provider in &provider_ids {
            if let Some(token) = entry.cancel_tokens.lock().get(&provider) {
                token.cancel();
            }
        }

        let deadline = tokio::time::Instant::now() + self.inner.drain_timeout;
        loop {
            let all_terminal = {
                let run = entry.run.lock();
                provider_ids.iter().all(|p| run.providers.get(p).map(|s| s.status.is_terminal()).unwrap_or(true))
            };
            if all_terminal || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        let destroyed = entry.destroyed.lock().clone();
        let providers = provider_ids
            .iter()
            .map(|&provider| ProviderStopResult { provider, destroyed: destroyed.get(&provider).copied().unwrap_or(false) })
            .collect();
        Ok(StopRunResponse { success: true, providers })
    }

    /// Subscribes to a run's event stream, returning the history accumulated
    /// so far alongside a channel for everything published from this point
    /// on (Testable Property 1).
    pub fn stream_run(&self, run_id: &RunId) -> Result<StreamHandle, CoordinatorError> {
        let entry = self.find(run_id)?;
        let (id, replay, rx) = entry.bus.subscribe();
        Ok(StreamHandle { bus: entry.bus.clone(), id, replay, rx })
    }

    pub fn providers(&self) -> ProvidersResponse {
        ProvidersResponse {
            providers: Provider::ALL
                .iter()
                .map(|&provider| ProviderEntry { provider, configured: self.inner.gateway.is_configured(provider) })
                .collect(),
        }
    }
}

struct RunProviderTask {
    inner: Arc<CoordinatorInner>,
    entry: Arc<RunEntry>,
    provider: Provider,
    repo: RepoLocation,
    branch: String,
    task: String,
    max_iterations: u32,
    idle_timeout_ms: u64,
    use_sse: bool,
    user_id: Option<String>,
    cancel: CancellationToken,
}

/// One provider's end-to-end lifecycle: prepare, iterate, tear down. Runs to
/// completion on its own Tokio task; all communication back to the rest of
/// the process goes through `task.entry`'s [`CoordinatorSink`] and the
/// [`fleet_storage::PersistenceStore`] (spec 4.1, 4.4-4.6).
async fn run_provider(task: RunProviderTask) {
    let RunProviderTask {
        inner,
        entry,
        provider,
        repo,
        branch,
        task: user_task,
        max_iterations,
        idle_timeout_ms,
        use_sse,
        user_id,
        cancel,
    } = task;

    let db_ralph_id = Arc::new(Mutex::new(None));
    let sink = CoordinatorSink { entry: entry.clone(), provider, persistence: inner.persistence.clone(), db_ralph_id: db_ralph_id.clone() };

    let pipeline_ctx = PipelineCtx { provider, repo: repo.clone(), branch, task: user_task.clone() };
    let pipeline = Pipeline::new(inner.gateway.clone(), inner.pipeline_config.clone());

    let prepared = tokio::select! {
        res = pipeline.run(pipeline_ctx, &sink) => res,
        _ = cancel.cancelled() => {
            fail_provider(&entry, provider, "aborted during preparation");
            sink.emit(EventData::Status { status: ProviderStatus::Failed, message: Some("aborted during preparation".to_string()) });
            teardown_known_sandbox(&inner, &entry, provider).await;
            return;
        }
    };

    let prepared = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            warn!(%provider, error = %err, "preparation pipeline failed");
            sink.emit(EventData::Error { message: err.to_string(), kind: Some("pipeline_error".to_string()) });
            fail_provider(&entry, provider, err.to_string());
            return;
        }
    };

    let user = user_id.as_deref().unwrap_or("anonymous");
    let db_sandbox_id = match inner.persistence.create_sandbox(user, &prepared.sandbox.sandbox_id, provider.as_str(), &repo.clone_url()).await {
        Ok(id) => id,
        Err(err) => {
            warn!(%err, "failed to persist sandbox record");
            None
        }
    };
    if let (Some(db_id), Some(url)) = (&db_sandbox_id, &prepared.agent_server_url) {
        if let Err(err) = inner.persistence.attach_url(db_id, url).await {
            warn!(%err, "failed to persist agent server url");
        }
    }
    if let Some(db_id) = &db_sandbox_id {
        match inner.persistence.create_ralph(user, db_id, &user_task).await {
            Ok(Some(ralph_id)) => *db_ralph_id.lock() = Some(ralph_id),
            Ok(None) => {}
            Err(err) => warn!(%err, "failed to persist ralph record"),
        }
    }

    let Some(agent_server_url) = prepared.agent_server_url.clone() else {
        sink.emit(EventData::Error {
            message: "agent server url could not be resolved".to_string(),
            kind: Some("agent_unreachable".to_string()),
        });
        fail_provider(&entry, provider, "agent server url could not be resolved");
        teardown(&inner, &entry, &prepared, provider).await;
        return;
    };

    let client = AgentClient::new(agent_server_url, provider);

    // spec 4.5's iteration precondition: the agent server must answer its
    // health probe before we hand it a session. A prepared-but-unhealthy
    // server fails the provider with `agent_unhealthy` rather than wasting
    // an iteration budget on a session that will never respond.
    match client.health().await {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            sink.emit(EventData::Error {
                message: "agent server health probe failed".to_string(),
                kind: Some("agent_unhealthy".to_string()),
            });
            fail_provider(&entry, provider, "agent server health probe failed");
            teardown(&inner, &entry, &prepared, provider).await;
            return;
        }
    }

    let iteration_ctx = IterationCtx {
        provider,
        task: user_task,
        marker: generate_marker(),
        config: IterationConfig { max_iterations, idle_timeout_ms },
        clock: SystemClock,
    };

    let outcome = tokio::select! {
        res = run_engine(use_sse, &client, iteration_ctx, &sink) => res,
        _ = cancel.cancelled() => {
            fail_provider(&entry, provider, "aborted during iteration");
            sink.emit(EventData::Status { status: ProviderStatus::Failed, message: Some("aborted during iteration".to_string()) });
            update_ralph_terminal(&inner.persistence, &db_ralph_id, "aborted", None).await;
            teardown(&inner, &entry, &prepared, provider).await;
            return;
        }
    };

    match outcome {
        Ok(outcome) => {
            {
                let mut run = entry.run.lock();
                if let Some(state) = run.providers.get_mut(&provider) {
                    if outcome.success {
                        state.transition(ProviderStatus::Completed);
                    } else {
                        state.fail(format!("iteration ended: {}", outcome.reason));
                    }
                }
            }
            finalize_if_terminal(&entry);
            sink.emit(EventData::Complete { message: Some(format!("finished after {} iterations", outcome.iterations)) });
            let status = if outcome.success { "completed" } else { "failed" };
            update_ralph_terminal(&inner.persistence, &db_ralph_id, status, Some(outcome.iterations)).await;
        }
        Err(err) => {
            warn!(%provider, error = %err, "iteration engine failed");
            sink.emit(EventData::Error { message: err.to_string(), kind: Some("iteration_error".to_string()) });
            fail_provider(&entry, provider, err.to_string());
            update_ralph_terminal(&inner.persistence, &db_ralph_id, "failed", None).await;
        }
    }

    teardown(&inner, &entry, &prepared, provider).await;
}

async fn run_engine(
    use_sse: bool,
    client: &AgentClient,
    ctx: IterationCtx<SystemClock>,
    sink: &dyn ProviderSink,
) -> Result<IterationOutcome, IterationError> {
    if use_sse {
        SseIterationEngine::new().run(client, ctx, sink).await
    } else {
        BlockingChatEngine::new().run(client, ctx, sink).await
    }
}

async fn update_ralph_terminal(
    persistence: &Arc<dyn PersistenceStore>,
    db_ralph_id: &Arc<Mutex<Option<String>>>,
    status: &str,
    iterations: Option<u32>,
) {
    let id = db_ralph_id.lock().clone();
    if let Some(id) = id {
        if let Err(err) = persistence.update_ralph_status(&id, status, iterations).await {
            warn!(%err, "failed to persist ralph status");
        }
    }
}

/// Best-effort sandbox teardown (spec 5). Failures are logged, never
/// surfaced — by this point the provider's terminal status is already set.
async fn teardown(inner: &CoordinatorInner, entry: &RunEntry, prepared: &PreparedAgent, provider: Provider) {
    let Ok(driver) = inner.gateway.driver(provider) else { return };
    match driver.destroy(&prepared.sandbox).await {
        Ok(()) => {
            entry.destroyed.lock().insert(provider, true);
        }
        Err(err) => warn!(%provider, error = %err, "failed to destroy sandbox"),
    }
}

/// Variant of [`teardown`] for cancellation during preparation, before a
/// [`PreparedAgent`] exists: reconstructs the sandbox handle from whatever
/// the pipeline had already recorded via `sink.set_sandbox_id`, if anything.
async fn teardown_known_sandbox(inner: &CoordinatorInner, entry: &RunEntry, provider: Provider) {
    let sandbox_id = entry.run.lock().providers.get(&provider).and_then(|s| s.sandbox_id.clone());
    let Some(sandbox_id) = sandbox_id else { return };
    let Ok(driver) = inner.gateway.driver(provider) else { return };
    let handle = fleet_adapters::gateway::SandboxHandle { sandbox_id };
    match driver.destroy(&handle).await {
        Ok(()) => {
            entry.destroyed.lock().insert(provider, true);
        }
        Err(err) => warn!(%provider, error = %err, "failed to destroy sandbox after cancellation"),
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
