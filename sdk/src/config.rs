//! Configuration capability
//!
//! Resolves the pipeline configuration for a build, for example from an
//! external repository or a generated template.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{nullable, Build, Config, Repo};
use crate::{Context, PluginError};

/// Version 1 of the config API
pub const V1: &str = "application/vnd.drone.config.v1+json";

/// A configuration request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    #[serde(deserialize_with = "nullable")]
    pub repo: Repo,
    #[serde(deserialize_with = "nullable")]
    pub build: Build,
}

/// Responds to a configuration request.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Find the configuration for the build.
    ///
    /// The error code selects the response status when it is a 4xx or 5xx
    /// code; anything else is reported as not found.
    async fn find(&self, ctx: &Context, req: &Request) -> Result<Config, PluginError>;
}
