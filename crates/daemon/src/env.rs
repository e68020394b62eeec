// SPDX-License-Identifier: MIT

//! Centralized environment-variable access for the daemon crate, grounded
//! in the teacher's own `env.rs` (one free function per variable) — renamed
//! from the `OJ_` prefix to `FLEET_` for this process.

use std::time::Duration;

/// TCP port the HTTP Control API listens on.
pub fn http_port() -> u16 {
    std::env::var("FLEET_HTTP_PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(8420)
}

/// Per-driver-operation timeout (spec 4.2's `GatewayConfig.op_timeout`).
pub fn driver_op_timeout() -> Duration {
    std::env::var("FLEET_DRIVER_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(60))
}

/// Bounded drain wait `stopRun` allows cancellation to settle before issuing
/// `destroy` (spec 5), mirroring the teacher's own shutdown-drain timeout.
pub fn drain_timeout() -> Duration {
    std::env::var("FLEET_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
