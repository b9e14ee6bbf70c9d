//! Drover SDK
//!
//! Shared library for plugin authors and callers: the domain data model, the
//! structured plugin error, the per-call context, and one module per
//! capability holding its media type, request envelope and plugin trait.

/// Domain data model
pub mod types;

/// Structured plugin errors
pub mod errors;

/// Per-call cancellation and deadline context
pub mod context;

/// Lenient JSON decoding
pub mod codec;

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

// Re-export commonly used types
pub use context::Context;
pub use errors::PluginError;
pub use types::{Build, Config, Registry, Repo, Secret, Stage, Step, System, User};
pub use validator::Verdict;
