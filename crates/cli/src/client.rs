// SPDX-License-Identifier: MIT

//! Thin HTTP client over `fleetd`'s Control API (spec 6).
//!
//! Grounded in the teacher's `DaemonClient` (one typed method per RPC
//! operation over its Unix-socket protocol, `cli::client_queries*`),
//! generalized from the teacher's bespoke binary protocol to plain
//! `reqwest` JSON requests because this spec's Control API is HTTP, not a
//! Unix-socket RPC.

use fleet_wire::{
    ErrorResponse, ProvidersResponse, RunSnapshot, StartRunRequest, StartRunResponse,
    StopRunResponse,
};
use futures_util::StreamExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach fleetd at {0}: {1}")]
    Unreachable(String, reqwest::Error),
    #[error("fleetd returned {status}: {message}")]
    Daemon { status: reqwest::StatusCode, message: String },
    #[error("malformed response from fleetd: {0}")]
    Decode(#[from] reqwest::Error),
}

/// Talks to one `fleetd` instance. Holds a reusable [`reqwest::Client`] and
/// the daemon's base URL, mirroring the teacher's one-connection-per-client
/// shape even though the transport underneath is HTTP rather than a
/// persistent socket.
pub struct FleetClient {
    http: reqwest::Client,
    base_url: String,
}

impl FleetClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|_| status.to_string());
            Err(ClientError::Daemon { status, message })
        }
    }

    pub async fn start_run(&self, req: &StartRunRequest) -> Result<StartRunResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/run"))
            .json(req)
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(self.base_url.clone(), e))?;
        self.decode(response).await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<RunSnapshot, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/run/{run_id}")))
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(self.base_url.clone(), e))?;
        self.decode(response).await
    }

    pub async fn stop_run(&self, run_id: &str) -> Result<StopRunResponse, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/run/{run_id}/stop")))
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(self.base_url.clone(), e))?;
        self.decode(response).await
    }

    pub async fn providers(&self) -> Result<ProvidersResponse, ClientError> {
        let response = self
            .http
            .get(self.url("/providers"))
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(self.base_url.clone(), e))?;
        self.decode(response).await
    }

    /// Streams `GET /run/{id}/stream`, invoking `on_frame` for every
    /// `data:` line of the SSE body (including `ping` keep-alives — the
    /// caller decides whether to surface those).
    pub async fn stream_run(
        &self,
        run_id: &str,
        mut on_frame: impl FnMut(&str),
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/run/{run_id}/stream")))
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(self.base_url.clone(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(ClientError::Daemon { status, message });
        }

        let mut buf = String::new();
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim_end_matches('\r').to_string();
                buf.drain(..=pos);
                if let Some(data) = line.strip_prefix("data:") {
                    on_frame(data.trim_start());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
