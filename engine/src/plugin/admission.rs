use async_trait::async_trait;
use http::StatusCode;
use sdk::admission::{Plugin, Request, V1};
use sdk::{Context, User};

use crate::client::ClientBuilder;
use crate::crypto::SharedSecret;
use crate::error::ClientError;
use crate::handler::{Capability, Handler, Outcome};

/// Runs an admission plugin: `200` with the user, `204` for no opinion, `403`
/// with the error text on denial.
pub struct Admission<P>(pub P);

#[async_trait]
impl<P: Plugin> Capability for Admission<P> {
    type Request = Request;
    const NAME: &'static str = "admission";

    async fn invoke(&self, ctx: &Context, req: Request) -> Outcome {
        match self.0.admit(ctx, &req).await {
            Ok(Some(user)) => Outcome::json(&user),
            Ok(None) => Outcome::NoContent,
            Err(err) => Outcome::text(StatusCode::FORBIDDEN, err.message),
        }
    }
}

/// Serve an admission plugin
pub fn handler<P: Plugin>(secret: SharedSecret, plugin: P) -> Handler<Admission<P>> {
    Handler::new(secret, Admission(plugin))
}

/// Calls a remote admission plugin
#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::client::Client,
}

impl Client {
    /// Create a client for an admission plugin at `endpoint`
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

    /// Ask the plugin to admit a user.
    ///
    /// `Ok(None)` means the plugin has no opinion. A denial is
    /// `ClientError::Status` with code 403.
    pub async fn admit(&self, ctx: &Context, req: &Request) -> Result<Option<User>, ClientError> {
        self.inner.send(ctx, req).await
    }
}
