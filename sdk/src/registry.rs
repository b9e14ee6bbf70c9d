//! Registry capability
//!
//! Supplies container registry credentials used to pull private images.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{nullable, Build, Registry, Repo};
use crate::{Context, PluginError};

/// Version 1 of the registry API
pub const V1: &str = "application/vnd.drone.registry.v1+json";

/// A registry request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    #[serde(deserialize_with = "nullable")]
    pub repo: Repo,
    #[serde(deserialize_with = "nullable")]
    pub build: Build,
}

/// Responds to a registry request.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// List the registry credentials for the build
    async fn list(&self, ctx: &Context, req: &Request) -> Result<Vec<Registry>, PluginError>;
}
