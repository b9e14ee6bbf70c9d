//! Environment capability
//!
//! Supplies extra environment variables to inject into a build.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{nullable, Build, Repo};
use crate::{Context, PluginError};

/// Version 1 of the environment API
pub const V1: &str = "application/vnd.drone.env.v1+json";

/// An environment request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    #[serde(deserialize_with = "nullable")]
    pub repo: Repo,
    #[serde(deserialize_with = "nullable")]
    pub build: Build,
}

/// Responds to an environment request.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// List the environment variables for the build
    async fn list(
        &self,
        ctx: &Context,
        req: &Request,
    ) -> Result<HashMap<String, String>, PluginError>;
}
