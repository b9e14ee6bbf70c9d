//! Capability wiring
//!
//! One module per capability. Each provides:
//! - an adapter that runs an `sdk` plugin trait behind the shared [`Handler`]
//!   and maps its result onto a status code
//! - a `handler(secret, plugin)` constructor
//! - a typed `Client` that sends the capability's media type and turns the
//!   response back into the trait's result
//!
//! [`Handler`]: crate::handler::Handler

/// Admission capability
pub mod admission;

/// Configuration capability
pub mod config;

/// Environment capability
pub mod environ;

/// Registry capability
pub mod registry;

/// Secret capability
pub mod secret;

/// Validation capability
pub mod validator;

/// Webhook capability
pub mod webhook;

/// Fixed environment and registry values served from configuration
pub mod store;
