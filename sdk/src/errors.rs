//! Structured plugin errors
//!
//! `PluginError` is the `{code, message}` value that travels over the wire when
//! a capability fails. Capabilities return it, handlers serialize it (or its
//! message) into the response, and callers reconstruct it from the status code
//! and body of a rejected response.
//!
//! # Security
//!
//! The message is visible to the caller. Capabilities must not place secrets
//! or internal details in it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status used when a capability fails without naming a code.
pub const DEFAULT_ERROR_CODE: u16 = 400;

/// A JSON-encoded plugin error.
///
/// # Examples
///
/// ```
/// use drover_sdk::PluginError;
///
/// let err = PluginError::not_found("no such secret");
/// assert_eq!(err.code, 404);
/// assert_eq!(err.to_string(), "no such secret");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct PluginError {
    /// Numeric status code
    #[serde(default)]
    pub code: u16,
    /// Human readable message, safe to show to the caller
    #[serde(default)]
    pub message: String,
}

impl PluginError {
    /// Create an error with the default code (400)
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(DEFAULT_ERROR_CODE, message)
    }

    /// Create an error with an explicit code
    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Access to the requested resource is denied (403)
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::with_code(403, message)
    }

    /// The requested resource does not exist (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(404, message)
    }

    /// The plugin failed internally (500)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(500, message)
    }

    /// Returns the code when it is a usable error status (4xx or 5xx)
    pub fn error_status(&self) -> Option<u16> {
        (400..=599).contains(&self.code).then_some(self.code)
    }
}

impl From<String> for PluginError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for PluginError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let err = PluginError::new("insufficient permission to mount volumes");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"code":400,"message":"insufficient permission to mount volumes"}"#
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let err: PluginError = serde_json::from_str("{}").unwrap();
        assert_eq!(err.code, 0);
        assert!(err.message.is_empty());
        assert_eq!(err.error_status(), None);
    }

    #[test]
    fn test_error_status_range() {
        assert_eq!(PluginError::not_found("x").error_status(), Some(404));
        assert_eq!(PluginError::internal("x").error_status(), Some(500));
        assert_eq!(PluginError::with_code(200, "x").error_status(), None);
        assert_eq!(PluginError::with_code(600, "x").error_status(), None);
    }
}
