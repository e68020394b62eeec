// SPDX-License-Identifier: MIT

//! Preparation Pipeline and Iteration Engine: turns a repo URL and a task
//! into a running, monitored agent inside one provider's sandbox.
//!
//! This crate knows nothing about concurrency across providers or runs —
//! that's the Run Coordinator's job (`fleet-daemon`). It exposes exactly
//! two entry points, [`pipeline::Pipeline::run`] and
//! [`iteration::IterationEngine::run`], both driven through the narrow
//! [`sink::ProviderSink`] callback so they stay ignorant of how the
//! Coordinator stores state.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod iteration;
pub mod marker;
pub mod pipeline;
pub mod sink;

pub use iteration::{
    BlockingChatEngine, IterationConfig, IterationCtx, IterationEngine, IterationError,
    IterationOutcome, SseIterationEngine,
};
pub use marker::{contains_marker, generate_marker, strip_code};
pub use pipeline::{NodePackageManager, Pipeline, PipelineConfig, PipelineCtx, PipelineError, PreparedAgent, ProjectKind};
pub use sink::ProviderSink;
