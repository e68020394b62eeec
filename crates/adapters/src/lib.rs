// SPDX-License-Identifier: MIT

//! Driver Gateway and Agent Client (spec 4.2, 4.3): the boundary between
//! the Run Coordinator and external sandbox providers / agent servers.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent_client;
pub mod gateway;
mod sse;

#[cfg(feature = "test-support")]
pub mod fake_agent_server;

#[cfg(feature = "test-support")]
pub mod fake_driver;

#[cfg(all(test, not(feature = "test-support")))]
mod fake_driver;

pub use agent_client::{AgentClient, AgentClientError, ChatResponse, CreateSessionResponse, ServerEvent};
pub use gateway::{DriverError, DriverGateway, ExecOptions, ExecResult, GatewayConfig, SandboxDriver, SandboxHandle};
