//! Validation capability
//!
//! Inspects a build and its configuration before the build is scheduled. The
//! outcome is one of four verdicts; `Skipped` and `Blocked` are ordinary
//! decisions, not failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{nullable, Build, Config, Repo};
use crate::{Context, PluginError};

/// Version 1 of the validator API
pub const V1: &str = "application/vnd.drone.validate.v1+json";

/// A validation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    #[serde(deserialize_with = "nullable")]
    pub build: Build,
    #[serde(deserialize_with = "nullable")]
    pub config: Config,
    #[serde(deserialize_with = "nullable")]
    pub repo: Repo,
}

/// Result of a validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The configuration is valid; proceed
    Accepted,
    /// The plugin has no opinion; proceed without it
    Skipped,
    /// The build must not run
    Blocked,
    /// The configuration is invalid
    Failed(PluginError),
}

impl Verdict {
    /// Returns true when the build may proceed
    pub fn allows(&self) -> bool {
        matches!(self, Self::Accepted | Self::Skipped)
    }
}

/// Responds to a validation request.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Validate the build
    async fn validate(&self, ctx: &Context, req: &Request) -> Verdict;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_allows() {
        assert!(Verdict::Accepted.allows());
        assert!(Verdict::Skipped.allows());
        assert!(!Verdict::Blocked.allows());
        assert!(!Verdict::Failed(PluginError::new("bad yaml")).allows());
    }
}
