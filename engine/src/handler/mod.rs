//! Inbound plugin requests
//!
//! [`Handler`] is the skeleton shared by every capability. For each request it:
//!
//! 1. parses the signature header (`400 Invalid or Missing Signature`)
//! 2. reads the body and verifies signature, digest and optional freshness
//!    (`400 Invalid Signature`)
//! 3. decodes the capability's request envelope (`400 Invalid Input`)
//! 4. invokes the capability with a [`Context`] cancelled when the request is
//!    dropped
//! 5. writes the capability's [`Outcome`], encrypting `200` bodies when the
//!    caller sent `Accept-Encoding: aesgcm`
//!
//! No state is retained between requests.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::Utc;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use sdk::{codec, Context, PluginError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::crypto::aesgcm::{self, Key};
use crate::crypto::{check_date, SharedSecret, Signature};

/// Body for a request without a usable signature header
pub const MSG_INVALID_OR_MISSING_SIGNATURE: &str = "Invalid or Missing Signature";

/// Body for a request whose signature does not verify
pub const MSG_INVALID_SIGNATURE: &str = "Invalid Signature";

/// Body for a request whose envelope does not decode
pub const MSG_INVALID_INPUT: &str = "Invalid Input";

/// Validation was skipped
pub const STATUS_SKIP: u16 = 498;

/// Validation blocked the build
pub const STATUS_BLOCK: u16 = 499;

/// Default maximum size of a request body
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

/// What a capability produced, before it is written to the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `200` with a JSON body
    Json(Vec<u8>),
    /// `204` without a body
    NoContent,
    /// A bodiless status, such as `498` or `499`
    Empty(StatusCode),
    /// A plain text error
    Text(StatusCode, String),
    /// A JSON `{code, message}` error
    Error(StatusCode, PluginError),
}

impl Outcome {
    /// Serialize a value into a `200` outcome
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::Json(body),
            Err(e) => {
                error!("Failed to encode plugin result: {}", e);
                internal_error()
            }
        }
    }

    /// A plain text error with the given status
    pub fn text(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Text(status, message.into())
    }

    /// The status this outcome is written with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Json(_) => StatusCode::OK,
            Self::NoContent => StatusCode::NO_CONTENT,
            Self::Empty(status) | Self::Text(status, _) | Self::Error(status, _) => *status,
        }
    }
}

/// One capability served behind the shared skeleton
#[async_trait]
pub trait Capability: Send + Sync + 'static {
    /// The request envelope
    type Request: DeserializeOwned + Send + 'static;

    /// Name used in logs
    const NAME: &'static str;

    /// Run the capability
    async fn invoke(&self, ctx: &Context, req: Self::Request) -> Outcome;
}

/// Signed request handler for one capability
pub struct Handler<C> {
    secret: SharedSecret,
    capability: Arc<C>,
    max_clock_skew: Option<Duration>,
    body_limit: usize,
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        Self {
            secret: self.secret.clone(),
            capability: Arc::clone(&self.capability),
            max_clock_skew: self.max_clock_skew,
            body_limit: self.body_limit,
        }
    }
}

impl<C: Capability> Handler<C> {
    /// Create a handler for a capability
    pub fn new(secret: SharedSecret, capability: C) -> Self {
        Self {
            secret,
            capability: Arc::new(capability),
            max_clock_skew: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Reject requests whose `Date` is further than `skew` from the local clock
    pub fn with_max_clock_skew(mut self, skew: Duration) -> Self {
        self.max_clock_skew = Some(skew);
        self
    }

    /// Maximum size of a request body
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Handle one request
    pub async fn serve(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();

        let signature = match Signature::from_headers(&parts.headers) {
            Ok(signature) => signature,
            Err(e) => {
                debug!("{}: rejected request: {}", C::NAME, e);
                return text(StatusCode::BAD_REQUEST, MSG_INVALID_OR_MISSING_SIGNATURE);
            }
        };

        let body = match to_bytes(body, self.body_limit).await {
            Ok(body) => body,
            Err(e) => {
                warn!("{}: failed to read request body: {}", C::NAME, e);
                return StatusCode::BAD_REQUEST.into_response();
            }
        };

        let path = parts.uri.path();
        if !signature.is_valid(&self.secret, &parts.method, path, &parts.headers, &body) {
            debug!("{}: signature did not verify", C::NAME);
            return text(StatusCode::BAD_REQUEST, MSG_INVALID_SIGNATURE);
        }

        if let Some(skew) = self.max_clock_skew {
            if let Err(e) = check_date(&parts.headers, skew, Utc::now()) {
                debug!("{}: rejected request: {}", C::NAME, e);
                return text(StatusCode::BAD_REQUEST, MSG_INVALID_SIGNATURE);
            }
        }

        let req: C::Request = match codec::from_slice(&body) {
            Ok(req) => req,
            Err(e) => {
                debug!("{}: cannot decode request: {}", C::NAME, e);
                return text(StatusCode::BAD_REQUEST, MSG_INVALID_INPUT);
            }
        };

        // Cancelled if this future is dropped, e.g. when the caller disconnects.
        let ctx = Context::background();
        let _cancel_on_drop = ctx.token().clone().drop_guard();

        let outcome = self.capability.invoke(&ctx.child(), req).await;
        self.respond(outcome, wants_encryption(&parts.headers))
    }

    /// Serve this handler on every path and method
    pub fn into_router(self) -> Router {
        Router::new().fallback(move |request: Request| {
            let handler = self.clone();
            async move { handler.serve(request).await }
        })
    }

    fn respond(&self, outcome: Outcome, encrypt: bool) -> Response {
        match outcome {
            Outcome::Json(body) if encrypt => match self.seal(&body) {
                Ok(sealed) => {
                    let mut response = Response::new(Body::from(sealed));
                    let headers = response.headers_mut();
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
                    headers.insert(CONTENT_ENCODING, HeaderValue::from_static(aesgcm::ENCODING));
                    response
                }
                Err(e) => {
                    error!("{}: failed to encrypt response: {}", C::NAME, e);
                    respond_plain(internal_error())
                }
            },
            other => respond_plain(other),
        }
    }

    fn seal(&self, body: &[u8]) -> Result<Vec<u8>, aesgcm::CipherError> {
        let key = Key::derive(&self.secret)?;
        aesgcm::encrypt(body, &key)
    }
}

fn respond_plain(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Json(body) => ([(CONTENT_TYPE, APPLICATION_JSON)], body).into_response(),
        Outcome::NoContent => StatusCode::NO_CONTENT.into_response(),
        Outcome::Empty(status) => status.into_response(),
        Outcome::Text(status, message) => text(status, &message),
        Outcome::Error(status, err) => match serde_json::to_vec(&err) {
            Ok(body) => (status, [(CONTENT_TYPE, APPLICATION_JSON)], body).into_response(),
            Err(_) => text(status, &err.message),
        },
    }
}

fn text(status: StatusCode, message: &str) -> Response {
    (status, [(CONTENT_TYPE, TEXT_PLAIN)], message.to_string()).into_response()
}

fn internal_error() -> Outcome {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    Outcome::Text(status, status.canonical_reason().unwrap_or("Internal Server Error").to_string())
}

/// Whether the caller listed `aesgcm` in `Accept-Encoding`
pub fn wants_encryption(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|coding| coding.split(';').next().unwrap_or("").trim())
        .any(|coding| coding.eq_ignore_ascii_case(aesgcm::ENCODING))
}

/// Build a status code from a number, falling back to 500
pub(crate) fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_encryption() {
        let mut headers = HeaderMap::new();
        assert!(!wants_encryption(&headers));

        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        assert!(!wants_encryption(&headers));

        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, AESGCM;q=1"));
        assert!(wants_encryption(&headers));
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(Outcome::json(&serde_json::json!({})).status(), StatusCode::OK);
        assert_eq!(Outcome::NoContent.status(), StatusCode::NO_CONTENT);
        assert_eq!(Outcome::Empty(status(STATUS_SKIP)).status().as_u16(), 498);
        assert_eq!(
            Outcome::Error(StatusCode::BAD_REQUEST, PluginError::new("bad")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_status_fallback() {
        assert_eq!(status(STATUS_BLOCK).as_u16(), 499);
        assert_eq!(status(42), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
