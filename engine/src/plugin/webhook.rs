use async_trait::async_trait;
use http::StatusCode;
use sdk::webhook::{Plugin, Request, V1};
use sdk::Context;

use crate::client::ClientBuilder;
use crate::crypto::SharedSecret;
use crate::error::ClientError;
use crate::handler::{Capability, Handler, Outcome};

/// Runs a webhook plugin: `204` on delivery, `500` with the error text on
/// failure.
pub struct Webhook<P>(pub P);

#[async_trait]
impl<P: Plugin> Capability for Webhook<P> {
    type Request = Request;
    const NAME: &'static str = "webhook";

    async fn invoke(&self, ctx: &Context, req: Request) -> Outcome {
        match self.0.deliver(ctx, &req).await {
            Ok(()) => Outcome::NoContent,
            Err(err) => Outcome::text(StatusCode::INTERNAL_SERVER_ERROR, err.message),
        }
    }
}

/// Serve a webhook plugin
pub fn handler<P: Plugin>(secret: SharedSecret, plugin: P) -> Handler<Webhook<P>> {
    Handler::new(secret, Webhook(plugin))
}

/// Delivers events to a remote webhook plugin
#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::client::Client,
}

impl Client {
    /// Create a client for a webhook plugin at `endpoint`
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

    /// Deliver an event
    pub async fn deliver(&self, ctx: &Context, req: &Request) -> Result<(), ClientError> {
        self.inner.send_unit(ctx, req).await
    }
}
