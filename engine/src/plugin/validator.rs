use async_trait::async_trait;
use http::StatusCode;
use sdk::validator::{Plugin, Request, V1};
use sdk::{Context, PluginError, Verdict};
use tracing::debug;

use crate::client::ClientBuilder;
use crate::crypto::SharedSecret;
use crate::error::{ClientError, ErrorExt, ErrorKind};
use crate::handler::{self, Capability, Handler, Outcome, STATUS_BLOCK, STATUS_SKIP};

/// Runs a validation plugin.
///
/// | Verdict  | Response |
/// |----------|----------|
/// | Accepted | `204` |
/// | Skipped  | `498` |
/// | Blocked  | `499` |
/// | Failed   | `400` with a JSON `{code, message}` body |
pub struct Validator<P>(pub P);

#[async_trait]
impl<P: Plugin> Capability for Validator<P> {
    type Request = Request;
    const NAME: &'static str = "validator";

    async fn invoke(&self, ctx: &Context, req: Request) -> Outcome {
        match self.0.validate(ctx, &req).await {
            Verdict::Accepted => Outcome::NoContent,
            Verdict::Skipped => {
                debug!("validator: skipped");
                Outcome::Empty(handler::status(STATUS_SKIP))
            }
            Verdict::Blocked => {
                debug!("validator: blocked");
                Outcome::Empty(handler::status(STATUS_BLOCK))
            }
            Verdict::Failed(err) => Outcome::Error(StatusCode::BAD_REQUEST, with_default_code(err)),
        }
    }
}

fn with_default_code(err: PluginError) -> PluginError {
    if err.code == 0 {
        PluginError::new(err.message)
    } else {
        err
    }
}

/// Serve a validation plugin
pub fn handler<P: Plugin>(secret: SharedSecret, plugin: P) -> Handler<Validator<P>> {
    Handler::new(secret, Validator(plugin))
}

/// Calls a remote validation plugin
#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::client::Client,
}

impl Client {
    /// Create a client for a validator plugin at `endpoint`
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

    /// Validate a build.
    ///
    /// `498` and `499` come back as [`Verdict::Skipped`] and
    /// [`Verdict::Blocked`], and a capability error as [`Verdict::Failed`].
    /// Signature, input, transport and crypto failures stay errors.
    pub async fn validate(&self, ctx: &Context, req: &Request) -> Result<Verdict, ClientError> {
        let err = match self.inner.send_unit(ctx, req).await {
            Ok(()) => return Ok(Verdict::Accepted),
            Err(err) => err,
        };

        match err.status() {
            Some(STATUS_SKIP) => {
                debug!("validator: plugin skipped");
                Ok(Verdict::Skipped)
            }
            Some(STATUS_BLOCK) => {
                debug!("validator: plugin blocked");
                Ok(Verdict::Blocked)
            }
            Some(400) if err.kind() == ErrorKind::Capability => match err {
                ClientError::Status { error, .. } => Ok(Verdict::Failed(error)),
                other => Err(other),
            },
            _ => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_without_code_becomes_bad_request() {
        let err = with_default_code(PluginError::with_code(0, "invalid yaml"));
        assert_eq!(err, PluginError::new("invalid yaml"));

        let err = with_default_code(PluginError::with_code(422, "unprocessable"));
        assert_eq!(err.code, 422);
    }
}
