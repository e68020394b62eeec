// SPDX-License-Identifier: MIT

//! `fleetd`: the Run Coordinator process. Binds the Control API (spec 6)
//! and drives runs to completion until the process is asked to shut down.

use std::collections::HashMap;
use std::sync::Arc;

use fleet_adapters::gateway::{DriverGateway, GatewayConfig};
use fleet_daemon::{env, http, Coordinator, CoordinatorConfig};
use fleet_engine::pipeline::PipelineConfig;
use fleet_storage::NullStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Concrete provider drivers (Modal/Docker/Daytona/E2B/Morph API clients)
    // are external collaborators outside this crate's scope; the gateway
    // starts with none configured, and `GET /providers` reports every
    // provider as unconfigured until a deployment wires real drivers in.
    let gateway = DriverGateway::new(HashMap::new(), GatewayConfig { op_timeout: Some(env::driver_op_timeout()) });

    let coordinator = Coordinator::new(CoordinatorConfig {
        gateway,
        pipeline_config: PipelineConfig::default(),
        persistence: Arc::new(NullStore),
        drain_timeout: env::drain_timeout(),
    });

    let app = http::router(coordinator);
    let addr = format!("0.0.0.0:{}", env::http_port());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|err| {
        panic!("failed to bind Control API listener on {addr}: {err}");
    });
    tracing::info!(%addr, "fleetd listening");

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(%err, "fleetd server exited with an error");
    }
}
