use async_trait::async_trait;
use http::StatusCode;
use sdk::config::{Plugin, Request, V1};
use sdk::{Config, Context};

use crate::client::ClientBuilder;
use crate::crypto::SharedSecret;
use crate::error::ClientError;
use crate::handler::{self, Capability, Handler, Outcome};

/// Runs a configuration plugin. A failure is written as text with the error's
/// own code when it is a 4xx or 5xx status, otherwise `404`.
pub struct ConfigFinder<P>(pub P);

#[async_trait]
impl<P: Plugin> Capability for ConfigFinder<P> {
    type Request = Request;
    const NAME: &'static str = "config";

    async fn invoke(&self, ctx: &Context, req: Request) -> Outcome {
        match self.0.find(ctx, &req).await {
            Ok(config) => Outcome::json(&config),
            Err(err) => {
                let status = err
                    .error_status()
                    .map(handler::status)
                    .unwrap_or(StatusCode::NOT_FOUND);
                Outcome::text(status, err.message)
            }
        }
    }
}

/// Serve a configuration plugin
pub fn handler<P: Plugin>(secret: SharedSecret, plugin: P) -> Handler<ConfigFinder<P>> {
    Handler::new(secret, ConfigFinder(plugin))
}

/// Calls a remote configuration plugin
#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::client::Client,
}

impl Client {
    /// Create a client for a config plugin at `endpoint`
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

    /// Fetch the pipeline configuration. `Ok(None)` when the plugin answers 204.
    pub async fn find(&self, ctx: &Context, req: &Request) -> Result<Option<Config>, ClientError> {
        self.inner.send(ctx, req).await
    }
}
