// SPDX-License-Identifier: MIT

//! Run Coordinator daemon library: the Event Bus, Coordinator, Control API
//! routes, and process environment wiring (spec 3/4/6).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod bus;
pub mod coordinator;
pub mod env;
pub mod error;
pub mod http;

pub use coordinator::{Coordinator, CoordinatorConfig};
pub use error::CoordinatorError;
