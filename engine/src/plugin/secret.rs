use async_trait::async_trait;
use http::StatusCode;
use sdk::secret::{Plugin, Request, V1};
use sdk::{Context, Secret};

use crate::client::ClientBuilder;
use crate::crypto::SharedSecret;
use crate::error::ClientError;
use crate::handler::{Capability, Handler, Outcome};

/// Runs a secret plugin: `200` with the secret, `204` when there is none,
/// `404` with the error text on failure.
pub struct SecretFinder<P>(pub P);

#[async_trait]
impl<P: Plugin> Capability for SecretFinder<P> {
    type Request = Request;
    const NAME: &'static str = "secret";

    async fn invoke(&self, ctx: &Context, req: Request) -> Outcome {
        match self.0.find(ctx, &req).await {
            Ok(Some(secret)) => Outcome::json(&secret),
            Ok(None) => Outcome::NoContent,
            Err(err) => Outcome::text(StatusCode::NOT_FOUND, err.message),
        }
    }
}

/// Serve a secret plugin
pub fn handler<P: Plugin>(secret: SharedSecret, plugin: P) -> Handler<SecretFinder<P>> {
    Handler::new(secret, SecretFinder(plugin))
}

/// Calls a remote secret plugin
#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::client::Client,
}

impl Client {
    /// Create a client for a secret plugin at `endpoint`
    pub fn new(
        endpoint: &str,
        secret: SharedSecret,
        skip_verify: bool,
    ) -> Result<Self, ClientError> {
        Self::from_builder(ClientBuilder::new(endpoint, secret).skip_verify(skip_verify))
    }

    /// Create a client from a prepared builder, overriding its `Accept` media type
    pub fn from_builder(builder: ClientBuilder) -> Result<Self, ClientError> {
        Ok(Self {
            inner: builder.accept(V1).build()?,
        })
    }

    /// Look up a named secret
    pub async fn find(&self, ctx: &Context, req: &Request) -> Result<Option<Secret>, ClientError> {
        self.inner.send(ctx, req).await
    }
}
