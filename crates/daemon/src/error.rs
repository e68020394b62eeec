// SPDX-License-Identifier: MIT

//! Coordinator-level error kinds (spec 7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleet_wire::{ErrorResponse, ValidationError};
use thiserror::Error;

/// Errors the Control API surface returns synchronously. Every other error
/// kind in spec 7's table (`driver_timeout`, `agent_unhealthy`,
/// `session_error`, ...) is surfaced as an `error` event on the affected
/// provider instead — never as an HTTP error (spec 7: "`validation` ...
/// returned synchronously; no run created" is the one synchronous kind).
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("run not found")]
    RunNotFound,
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoordinatorError::Validation(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::RunNotFound => StatusCode::NOT_FOUND,
        };
        (status, Json(ErrorResponse { message: self.to_string() })).into_response()
    }
}
