//! Admission capability
//!
//! Asks a plugin whether a user may log in or register. The plugin can return
//! an amended user, return nothing to express no opinion, or deny access.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{nullable, User};
use crate::{Context, PluginError};

/// Version 1 of the admission API
pub const V1: &str = "application/vnd.drone.admission.v1+json";

/// The user is logging in
pub const EVENT_LOGIN: &str = "login";

/// The user is registering a new account
pub const EVENT_REGISTER: &str = "register";

/// An admission request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(deserialize_with = "nullable")]
    pub user: User,
}

/// Responds to an admission request.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Admit the user.
    ///
    /// Returning `Ok(None)` means the plugin has no opinion and the core
    /// proceeds with the user it already has. Any error denies access.
    async fn admit(&self, ctx: &Context, req: &Request) -> Result<Option<User>, PluginError>;
}
