// SPDX-License-Identifier: MIT

//! Control API routes (spec 6): `POST /run`, `GET /run/{id}`,
//! `POST /run/{id}/stop`, `GET /run/{id}/stream`, `GET /providers`.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use fleet_core::RunId;
use fleet_wire::{ProvidersResponse, RunSnapshot, StartRunRequest, StartRunResponse, StopRunResponse, StreamFrame};
use futures_util::stream::{self, Stream, StreamExt};

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;

pub fn router(coordinator: Coordinator) -> Router {
    Router::new()
        .route("/run", post(start_run))
        .route("/run/:id", get(get_run))
        .route("/run/:id/stop", post(stop_run))
        .route("/run/:id/stream", get(stream_run))
        .route("/providers", get(providers))
        .with_state(coordinator)
}

async fn start_run(
    State(coordinator): State<Coordinator>,
    Json(body): Json<StartRunRequest>,
) -> Result<Json<StartRunResponse>, CoordinatorError> {
    let validated = body.validate()?;
    Ok(Json(coordinator.start_run(validated)))
}

async fn get_run(
    State(coordinator): State<Coordinator>,
    Path(id): Path<String>,
) -> Result<Json<RunSnapshot>, CoordinatorError> {
    let run_id = RunId::from_string(id);
    Ok(Json(coordinator.get_run(&run_id)?))
}

async fn stop_run(
    State(coordinator): State<Coordinator>,
    Path(id): Path<String>,
) -> Result<Json<StopRunResponse>, CoordinatorError> {
    let run_id = RunId::from_string(id);
    Ok(Json(coordinator.stop_run(&run_id).await?))
}

/// Streams a run's event history followed by everything published after the
/// subscriber attached, framed per spec 6. Transport-level keep-alive pings
/// cover the "heartbeat every 30s, out-of-band" requirement (spec 4.1) —
/// [`StreamFrame::ping`] exists for callers that need an in-band synthetic
/// frame instead, but this route relies on axum's own SSE comment keep-alive.
async fn stream_run(
    State(coordinator): State<Coordinator>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, CoordinatorError> {
    let run_id = RunId::from_string(id);
    let handle = coordinator.stream_run(&run_id)?;

    let replay = stream::iter(handle.replay.clone());
    let live = stream::unfold(handle, |mut handle| async move {
        let event = handle.rx.recv().await?;
        Some((event, handle))
    });

    let frames = replay.chain(live).map(|event| {
        let frame = StreamFrame::from_event(&event);
        let payload = serde_json::to_string(&frame).unwrap_or_default();
        Ok(Event::default().event(frame.frame_type).data(payload))
    });

    Ok(Sse::new(frames).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)).text("ping")))
}

async fn providers(State(coordinator): State<Coordinator>) -> Json<ProvidersResponse> {
    Json(coordinator.providers())
}
