// SPDX-License-Identifier: MIT

//! Session identifiers.
//!
//! Two distinct notions: [`IterationSessionId`] is a core-generated id
//! scoping one iteration (used for log correlation before the agent server
//! has replied), and [`AgentSessionId`] is the opaque session string the
//! agent server itself returns from `createSession`. They are never
//! interchangeable — session-filtering discipline (spec 4.5) keys off the
//! latter.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Core-side identifier for one iteration's session scope.
    pub struct IterationSessionId("ses-");
}

/// Opaque session identifier returned by the agent server's `createSession`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentSessionId(pub String);

impl AgentSessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentSessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentSessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for AgentSessionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
