// SPDX-License-Identifier: MIT

//! Provider tags — the compute backends a run can be dispatched across.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A specific sandbox-execution backend.
///
/// Closed enum rather than a free string: the Driver Gateway builds one
/// driver handle per variant at process start, so an unconfigured provider
/// is a compile-time-exhaustive match, not a runtime string lookup miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Modal,
    Docker,
    Daytona,
    E2b,
    Morph,
}

impl Provider {
    pub const ALL: [Provider; 5] =
        [Provider::Modal, Provider::Docker, Provider::Daytona, Provider::E2b, Provider::Morph];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Modal => "modal",
            Provider::Docker => "docker",
            Provider::Daytona => "daytona",
            Provider::E2b => "e2b",
            Provider::Morph => "morph",
        }
    }

    /// Default base image tag used by the Preparation Pipeline's create step.
    pub fn default_base_image(&self) -> &'static str {
        match self {
            Provider::Modal => "modal-base:latest",
            Provider::Docker => "ubuntu:24.04",
            Provider::Daytona => "daytonaio/workspace:latest",
            Provider::E2b => "base",
            Provider::Morph => "morph-base",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown provider: {0}")]
pub struct ParseProviderError(pub String);

impl FromStr for Provider {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modal" => Ok(Provider::Modal),
            "docker" => Ok(Provider::Docker),
            "daytona" => Ok(Provider::Daytona),
            "e2b" => Ok(Provider::E2b),
            "morph" => Ok(Provider::Morph),
            other => Err(ParseProviderError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
