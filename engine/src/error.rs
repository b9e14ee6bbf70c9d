//! Error types and handling
//!
//! This module provides the error type returned by every outbound call. All
//! errors implement the `ErrorExt` trait which classifies them, gives a
//! user-friendly hint and indicates whether they are recoverable.
//!
//! # Security
//!
//! Hints never include the shared secret, request bodies or the reason a
//! signature or ciphertext was rejected.

use sdk::PluginError;
use thiserror::Error;

use crate::crypto::{CipherError, SignatureError};
use crate::handler::{MSG_INVALID_INPUT, MSG_INVALID_OR_MISSING_SIGNATURE, MSG_INVALID_SIGNATURE};

/// Broad class of a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The plugin rejected the request signature
    Authentication,
    /// The request could not be built, or the plugin could not decode it
    Input,
    /// The capability itself reported an error
    Capability,
    /// Key derivation, encryption or decryption failed
    Crypto,
    /// Network failure, timeout or cancellation
    Transport,
    /// The plugin answered with something this side cannot use
    Protocol,
}

/// How a rejected response carried its message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBody {
    /// Plain text or no body, as written by the request skeleton
    Text,
    /// A JSON `{code, message}` object reported by the capability
    Json,
}

/// Trait for error extensions
pub trait ErrorExt {
    /// Classify the error
    fn kind(&self) -> ErrorKind;

    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display and does not contain:
    /// - The shared secret or key material
    /// - Request or response bodies
    /// - Which cryptographic check failed
    fn user_hint(&self) -> &str;

    /// Returns whether retrying the call may succeed
    fn is_recoverable(&self) -> bool;
}

/// Error returned by the caller
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to sign request: {0}")]
    Sign(#[from] SignatureError),

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Response exceeded {limit} bytes")]
    ResponseTooLarge { limit: usize },

    #[error("{error}")]
    Status {
        /// HTTP status of the response
        status: u16,
        error: PluginError,
        body: ErrorBody,
    },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CipherError),

    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ClientError {
    /// The HTTP status of a rejected response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The structured error of a rejected response
    pub fn plugin_error(&self) -> Option<&PluginError> {
        match self {
            Self::Status { error, .. } => Some(error),
            _ => None,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

impl ErrorExt for ClientError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Encode(_) => ErrorKind::Input,
            Self::Sign(_) => ErrorKind::Authentication,
            Self::Transport(_) | Self::Timeout | Self::Cancelled | Self::DeadlineExceeded => {
                ErrorKind::Transport
            }
            Self::ResponseTooLarge { .. } | Self::Decode(_) => ErrorKind::Protocol,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Status { status, error, body } => match (*status, body) {
                (300..=399, _) => ErrorKind::Protocol,
                (400, ErrorBody::Text) => match error.message.as_str() {
                    MSG_INVALID_OR_MISSING_SIGNATURE | MSG_INVALID_SIGNATURE => {
                        ErrorKind::Authentication
                    }
                    MSG_INVALID_INPUT => ErrorKind::Input,
                    _ => ErrorKind::Capability,
                },
                _ => ErrorKind::Capability,
            },
        }
    }

    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check the plugin endpoint and client settings",
            Self::Encode(_) => "The request could not be serialized",
            Self::Sign(_) => "The request could not be signed",
            Self::Transport(_) => "Network operation failed. Check the plugin endpoint",
            Self::Timeout => "The plugin took too long to respond. Try again",
            Self::Cancelled => "The call was cancelled",
            Self::DeadlineExceeded => "The call ran past its deadline",
            Self::ResponseTooLarge { .. } => "The plugin response was too large",
            Self::Crypto(_) => {
                "Payload encryption failed. Check that both sides share the same secret"
            }
            Self::Decode(_) => "The plugin response could not be decoded",
            Self::Status { .. } => match self.kind() {
                ErrorKind::Authentication => {
                    "The plugin rejected the request signature. Check the shared secret"
                }
                ErrorKind::Input => "The plugin could not decode the request",
                ErrorKind::Protocol => {
                    "The plugin redirected the request. Redirects are not followed"
                }
                _ => "The plugin reported an error",
            },
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Status { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}
