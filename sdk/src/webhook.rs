//! Webhook capability
//!
//! Delivers system events (builds, repositories, users) to a plugin.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Build, Repo, System, User};
use crate::{Context, PluginError};

/// Version 1 of the webhook API
pub const V1: &str = "application/vnd.drone.webhook.v1+json";

// Webhook event types.
pub const EVENT_BUILD: &str = "build";
pub const EVENT_REPO: &str = "repo";
pub const EVENT_USER: &str = "user";

// Webhook action types.
pub const ACTION_CREATED: &str = "created";
pub const ACTION_UPDATED: &str = "updated";
pub const ACTION_DELETED: &str = "deleted";
pub const ACTION_ENABLED: &str = "enabled";
pub const ACTION_DISABLED: &str = "disabled";

/// A webhook request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    pub event: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<Repo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<Build>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<System>,
}

/// Responds to a webhook request.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Deliver the event
    async fn deliver(&self, ctx: &Context, req: &Request) -> Result<(), PluginError>;
}
