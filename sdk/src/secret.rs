//! Secret capability
//!
//! Looks up a single named secret from an external store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{nullable, Build, Repo, Secret};
use crate::{Context, PluginError};

/// Version 1 of the secret API
pub const V1: &str = "application/vnd.drone.secret.v1+json";

/// A secret request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    pub name: String,
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub repo: Repo,
    #[serde(deserialize_with = "nullable")]
    pub build: Build,
}

/// Responds to a secret request.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Find the named secret. `Ok(None)` means the store has no such secret.
    async fn find(&self, ctx: &Context, req: &Request) -> Result<Option<Secret>, PluginError>;
}
