//! Outbound plugin calls
//!
//! A [`Client`] sends one signed `POST` per call to a plugin endpoint and
//! turns the response into a typed value or a [`ClientError`]:
//!
//! - status above 299: [`ClientError::Status`] with the code and the body as
//!   the message (or the status text when the body is empty)
//! - 204: success without a value; the body is not decoded
//! - otherwise: the body, decrypted first when the plugin sent
//!   `Content-Encoding: aesgcm`, decoded as JSON
//!
//! Redirects are never followed. Each call runs under a [`Context`]; when it
//! is cancelled or its deadline passes the in-flight exchange is dropped.
//!
//! # Example
//!
//! ```no_run
//! use drover::client::ClientBuilder;
//! use drover::crypto::SharedSecret;
//! use sdk::Context;
//!
//! # async fn run() -> Result<(), drover::error::ClientError> {
//! let client = ClientBuilder::new("http://localhost:3000", SharedSecret::new("top-secret"))
//!     .accept("application/vnd.drone.env.v1+json")
//!     .build()?;
//!
//! let env: Option<std::collections::HashMap<String, String>> = client
//!     .send(&Context::background(), &serde_json::json!({"repo": {}}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use http::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use reqwest::redirect::Policy;
use reqwest::Url;
use sdk::{codec, Context, PluginError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::crypto::aesgcm::{self, Key};
use crate::crypto::{signature, SharedSecret};
use crate::error::{ClientError, ErrorBody};
use crate::handler::{STATUS_BLOCK, STATUS_SKIP};

/// Default media type sent in `Accept`
pub const DEFAULT_ACCEPT: &str = "application/json";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default maximum size of a response body
pub const DEFAULT_RESPONSE_LIMIT: usize = 10 * 1024 * 1024;

/// Bytes drained from an oversized body before the response is released
pub const DRAIN_LIMIT: usize = 4096;

const IDENTITY: &str = "identity";

/// Builder for [`Client`]
#[derive(Debug)]
pub struct ClientBuilder {
    endpoint: String,
    secret: SharedSecret,
    accept: String,
    encrypt: bool,
    skip_verify: bool,
    timeout: Option<Duration>,
    response_limit: usize,
    http: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Start a builder for a plugin endpoint
    pub fn new(endpoint: impl Into<String>, secret: SharedSecret) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret,
            accept: DEFAULT_ACCEPT.to_string(),
            encrypt: false,
            skip_verify: false,
            timeout: Some(DEFAULT_TIMEOUT),
            response_limit: DEFAULT_RESPONSE_LIMIT,
            http: None,
        }
    }

    /// Media type sent in `Accept`
    pub fn accept(mut self, media_type: impl Into<String>) -> Self {
        self.accept = media_type.into();
        self
    }

    /// Ask the plugin to encrypt its response body
    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Skip TLS certificate verification.
    ///
    /// Only for self-signed deployments. Off unless set explicitly.
    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    /// Request timeout; `None` leaves the call bounded only by its context
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maximum size of a response body
    pub fn response_limit(mut self, limit: usize) -> Self {
        self.response_limit = limit;
        self
    }

    /// Use a caller-supplied HTTP client.
    ///
    /// Its redirect, TLS and timeout settings are used as they are.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Client, ClientError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| {
            ClientError::Config(format!("invalid endpoint {:?}: {}", self.endpoint, e))
        })?;

        let accept = HeaderValue::from_str(&self.accept)
            .map_err(|_| ClientError::Config(format!("invalid media type {:?}", self.accept)))?;

        let key = if self.encrypt {
            Some(Key::derive(&self.secret)?)
        } else {
            None
        };

        let http = match self.http {
            Some(client) => client,
            None => {
                if self.skip_verify {
                    warn!("TLS certificate verification disabled for {}", endpoint);
                }
                let mut builder = reqwest::Client::builder()
                    .redirect(Policy::none())
                    .danger_accept_invalid_certs(self.skip_verify);
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build().map_err(|e| {
                    ClientError::Config(format!("failed to build HTTP client: {}", e))
                })?
            }
        };

        Ok(Client {
            endpoint,
            secret: self.secret,
            key,
            accept,
            response_limit: self.response_limit,
            http,
        })
    }
}

/// Signed HTTP client for one plugin endpoint.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Url,
    secret: SharedSecret,
    key: Option<Key>,
    accept: HeaderValue,
    response_limit: usize,
    http: reqwest::Client,
}

impl Client {
    /// Create a client with default settings
    pub fn new(endpoint: impl Into<String>, secret: SharedSecret) -> Result<Self, ClientError> {
        ClientBuilder::new(endpoint, secret).build()
    }

    /// Start a builder
    pub fn builder(endpoint: impl Into<String>, secret: SharedSecret) -> ClientBuilder {
        ClientBuilder::new(endpoint, secret)
    }

    /// The plugin endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Whether responses are requested encrypted
    pub fn encrypts(&self) -> bool {
        self.key.is_some()
    }

    /// Send `input` and decode the response.
    ///
    /// Returns `Ok(None)` when the plugin answers 204 or sends a `null` body.
    /// `null` object members decode like absent fields.
    pub async fn send<I, O>(&self, ctx: &Context, input: &I) -> Result<Option<O>, ClientError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        match self.exchange(ctx, input).await? {
            Some(body) => codec::from_slice::<Option<O>>(&body).map_err(ClientError::Decode),
            None => Ok(None),
        }
    }

    /// Send `input` and discard any response body
    pub async fn send_unit<I>(&self, ctx: &Context, input: &I) -> Result<(), ClientError>
    where
        I: Serialize + ?Sized,
    {
        self.exchange(ctx, input).await.map(|_| ())
    }

    /// Perform the signed exchange; `None` on 204
    async fn exchange<I>(&self, ctx: &Context, input: &I) -> Result<Option<Vec<u8>>, ClientError>
    where
        I: Serialize + ?Sized,
    {
        if ctx.is_cancelled() {
            return Err(cancelled(ctx));
        }

        let body = serde_json::to_vec(input).map_err(ClientError::Encode)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, self.accept.clone());
        headers.insert(
            ACCEPT_ENCODING,
            HeaderValue::from_static(if self.key.is_some() { aesgcm::ENCODING } else { IDENTITY }),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        signature::sign(&self.secret, &mut headers, &body)?;

        debug!("Calling plugin at {}", self.endpoint);

        let request = self.http.post(self.endpoint.clone()).headers(headers).body(body);
        let call = async {
            let response = request.send().await.map_err(ClientError::from_transport)?;
            self.read_response(response).await
        };

        tokio::select! {
            biased;
            _ = ctx.done() => {
                debug!("Plugin call to {} abandoned", self.endpoint);
                Err(cancelled(ctx))
            }
            result = call => result,
        }
    }

    async fn read_response(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        let status = response.status();
        let encrypted = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().eq_ignore_ascii_case(aesgcm::ENCODING))
            .unwrap_or(false);

        let body = read_body(response, self.response_limit).await?;
        debug!("Plugin responded {} with {} bytes", status.as_u16(), body.len());

        if status.as_u16() > 299 {
            return Err(status_error(status, &body));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !encrypted {
            return Ok(Some(body));
        }

        let plaintext = match &self.key {
            Some(key) => aesgcm::decrypt(&body, key)?,
            None => aesgcm::decrypt(&body, &Key::derive(&self.secret)?)?,
        };
        Ok(Some(plaintext))
    }
}

fn cancelled(ctx: &Context) -> ClientError {
    if ctx.deadline_exceeded() {
        ClientError::DeadlineExceeded
    } else {
        ClientError::Cancelled
    }
}

/// Read the body up to `limit` bytes.
///
/// An oversized body is drained by up to [`DRAIN_LIMIT`] more bytes before the
/// response is dropped.
async fn read_body(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ClientError> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            drain(&mut response).await;
            return Err(ClientError::ResponseTooLarge { limit });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(ClientError::from_transport)? {
        if body.len() + chunk.len() > limit {
            drain(&mut response).await;
            return Err(ClientError::ResponseTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

async fn drain(response: &mut reqwest::Response) {
    let mut drained = 0;
    while drained < DRAIN_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => drained += chunk.len(),
            _ => break,
        }
    }
}

/// Build the error for a rejected response.
///
/// A JSON `{code, message}` body is taken as a capability error and keeps
/// its own code when that is a 4xx or 5xx status. Any other body is used as
/// text, and an empty body falls back to the status text.
pub(crate) fn status_error(status: StatusCode, body: &[u8]) -> ClientError {
    let code = status.as_u16();

    if let Ok(err) = serde_json::from_slice::<PluginError>(body) {
        if !err.message.is_empty() {
            let own_code = err.error_status().unwrap_or(code);
            return ClientError::Status {
                status: code,
                error: PluginError::with_code(own_code, err.message),
                body: ErrorBody::Json,
            };
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let message = if text.is_empty() { status_text(code) } else { text };
    ClientError::Status {
        status: code,
        error: PluginError::with_code(code, message),
        body: ErrorBody::Text,
    }
}

/// Status text, including the two reserved validation codes
pub fn status_text(code: u16) -> &'static str {
    match code {
        STATUS_SKIP => "Skip",
        STATUS_BLOCK => "Block",
        _ => StatusCode::from_u16(code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown Status"),
    }
}
