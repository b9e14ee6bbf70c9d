//! Drover Engine Library
//!
//! The signed HTTP protocol between a core service and its plugins: request
//! signing, optional response encryption, the outbound caller and the inbound
//! handler skeleton, wired up for each capability. It is used by both the
//! main binary and integration tests.

/// Configuration management module
pub mod config;

/// Cryptographic operations module
pub mod crypto;

/// Caller error taxonomy
pub mod error;

/// Outbound plugin calls
pub mod client;

/// Inbound request handling shared by all capabilities
pub mod handler;

/// Per-capability handlers and typed clients
pub mod plugin;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

pub use client::{Client, ClientBuilder};
pub use crypto::SharedSecret;
pub use error::{ClientError, ErrorBody, ErrorExt, ErrorKind};
pub use handler::{Capability, Handler, Outcome};
