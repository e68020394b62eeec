// SPDX-License-Identifier: MIT

//! Persistence Store (spec 6): an optional, best-effort durability layer
//! sitting outside the core. Scoped down from the teacher's
//! `oj-storage::state` materialized-state tables (which back a WAL-backed
//! job queue) to exactly the five operations the Run Coordinator needs —
//! this crate owns no WAL or snapshot format of its own; durability of the
//! store is the concern of whatever backs a [`PersistenceStore`]
//! implementation, not of this crate.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod null;
mod store;

#[cfg(feature = "test-support")]
mod memory;

#[cfg(all(test, not(feature = "test-support")))]
mod memory;

#[cfg(feature = "test-support")]
pub use memory::MemoryStore;

pub use null::NullStore;
pub use store::{PersistenceError, PersistenceStore};
