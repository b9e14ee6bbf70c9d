use async_trait::async_trait;
use http::StatusCode;
use sdk::environ::{Plugin, Request, V1};
use sdk::Context;
use std::collections::HashMap;

use crate::client::ClientBuilder;
use crate::crypto::SharedSecret;
use crate::error::ClientError;
use crate::handler::{Capability, Handler, Outcome};

/// Runs an environment plugin: `200` with the variables, `404` with the error
/// text on failure.
pub struct Environ<P>(pub P);

#[async_trait]
impl<P: Plugin> Capability for Environ<P> {
    type Request = Request;
    const NAME: &'static str = "environ";

    async fn invoke(&self, ctx: &Context, req: Request) -> Outcome {
        match self.0.list(ctx, &req).await {
            Ok(env) => Outcome::json(&env),
            Err(err) => Outcome::text(StatusCode::NOT_FOUND, err.message),
        }
    }
}

/// Serve an environment plugin
pub fn handler<P: Plugin>(secret: SharedSecret, plugin: P) -> Handler<Environ<P>> {
    Handler::new(secret, Environ(plugin))
}

/// Calls a remote environment plugin
#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::client::Client,
}

impl Client {
    /// Create a client for an environ plugin at `endpoint`
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

    /// List environment variables for a build
    pub async fn list(
        &self,
        ctx: &Context,
        req: &Request,
    ) -> Result<HashMap<String, String>, ClientError> {
        Ok(self.inner.send(ctx, req).await?.unwrap_or_default())
    }
}
