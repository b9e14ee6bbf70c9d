use async_trait::async_trait;
use http::StatusCode;
use sdk::registry::{Plugin, Request, V1};
use sdk::{Context, Registry};

use crate::client::ClientBuilder;
use crate::crypto::SharedSecret;
use crate::error::ClientError;
use crate::handler::{Capability, Handler, Outcome};

/// Runs a registry plugin: `200` with the credentials, `404` with the error
/// text on failure.
pub struct Registries<P>(pub P);

#[async_trait]
impl<P: Plugin> Capability for Registries<P> {
    type Request = Request;
    const NAME: &'static str = "registry";

    async fn invoke(&self, ctx: &Context, req: Request) -> Outcome {
        match self.0.list(ctx, &req).await {
            Ok(registries) => Outcome::json(&registries),
            Err(err) => Outcome::text(StatusCode::NOT_FOUND, err.message),
        }
    }
}

/// Serve a registry plugin
pub fn handler<P: Plugin>(secret: SharedSecret, plugin: P) -> Handler<Registries<P>> {
    Handler::new(secret, Registries(plugin))
}

/// Calls a remote registry plugin
#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::client::Client,
}

impl Client {
    /// Create a client for a registry plugin at `endpoint`
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

    /// List registry credentials for a build
    pub async fn list(&self, ctx: &Context, req: &Request) -> Result<Vec<Registry>, ClientError> {
        Ok(self.inner.send(ctx, req).await?.unwrap_or_default())
    }
}
