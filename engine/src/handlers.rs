//! Command handlers for CLI operations
//!
//! This module implements the handlers for the CLI commands:
//! - serve: Host the [static] config values as an environment or registry plugin
//! - call: Send one signed request to a plugin and print the result

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::cli::{CapabilityKind, ServeKind};
use crate::client::ClientBuilder;
use crate::config::Config;
use crate::error::{ClientError, ErrorExt};
use crate::handler::{Capability, Handler};
use crate::plugin::store::FixedStore;
use crate::plugin::{
    admission, config as config_plugin, environ, registry, secret, validator, webhook,
};
use sdk::{codec, Context, Verdict};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Serve a fixed environment or registry plugin until interrupted
pub async fn handle_serve(kind: ServeKind, bind: Option<String>, config: &Config) -> Result<()> {
    let secret = config.shared_secret()?;
    let addr: SocketAddr = match bind {
        Some(bind) => bind
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", bind))?,
        None => config.bind_addr()?,
    };

    let store = FixedStore::new(config.fixed.env.clone(), config.fixed.registries.clone());
    let router = match kind {
        ServeKind::Env => configure(environ::handler(secret, store), config).into_router(),
        ServeKind::Registry => configure(registry::handler(secret, store), config).into_router(),
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Serving {:?} plugin on {}", kind, addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

fn configure<C: Capability>(handler: Handler<C>, config: &Config) -> Handler<C> {
    let handler = handler.with_body_limit(config.server.body_limit);
    match config.max_clock_skew() {
        Some(skew) => handler.with_max_clock_skew(skew),
        None => handler,
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

/// Send one request to a plugin and print the decoded result
pub async fn handle_call(
    capability: CapabilityKind,
    endpoint: Option<String>,
    input: &str,
    encrypt: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let secret = config.shared_secret()?;
    let mut builder = config.client_builder(secret, endpoint.as_deref())?;
    if encrypt {
        builder = builder.encrypt(true);
    }

    let raw = read_input(input).await?;

    // Ctrl-C aborts the in-flight call.
    let ctx = Context::background();
    let token = ctx.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = call(capability, builder, &ctx, &raw).await?;
    print_result(capability, &result, format)
}

async fn call(
    capability: CapabilityKind,
    builder: ClientBuilder,
    ctx: &Context,
    raw: &str,
) -> Result<Value> {
    let value = match capability {
        CapabilityKind::Admission => {
            let client = admission::Client::from_builder(builder).map_err(describe)?;
            serde_json::to_value(client.admit(ctx, &decode(raw)?).await.map_err(describe)?)?
        }
        CapabilityKind::Config => {
            let client = config_plugin::Client::from_builder(builder).map_err(describe)?;
            serde_json::to_value(client.find(ctx, &decode(raw)?).await.map_err(describe)?)?
        }
        CapabilityKind::Environ => {
            let client = environ::Client::from_builder(builder).map_err(describe)?;
            serde_json::to_value(client.list(ctx, &decode(raw)?).await.map_err(describe)?)?
        }
        CapabilityKind::Registry => {
            let client = registry::Client::from_builder(builder).map_err(describe)?;
            serde_json::to_value(client.list(ctx, &decode(raw)?).await.map_err(describe)?)?
        }
        CapabilityKind::Secret => {
            let client = secret::Client::from_builder(builder).map_err(describe)?;
            serde_json::to_value(client.find(ctx, &decode(raw)?).await.map_err(describe)?)?
        }
        CapabilityKind::Validator => {
            let client = validator::Client::from_builder(builder).map_err(describe)?;
            verdict_json(&client.validate(ctx, &decode(raw)?).await.map_err(describe)?)
        }
        CapabilityKind::Webhook => {
            let client = webhook::Client::from_builder(builder).map_err(describe)?;
            client.deliver(ctx, &decode(raw)?).await.map_err(describe)?;
            Value::Null
        }
    };
    Ok(value)
}

async fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read request from stdin")?;
        Ok(buf)
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read request file {}", input))
    }
}

/// Decode a request envelope; empty input is an empty envelope
fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    codec::from_str(raw).context("Input is not a valid request envelope")
}

fn describe(err: ClientError) -> anyhow::Error {
    let hint = err.user_hint().to_string();
    anyhow::Error::new(err).context(hint)
}

fn verdict_json(verdict: &Verdict) -> Value {
    match verdict {
        Verdict::Accepted => json!({ "verdict": "accepted" }),
        Verdict::Skipped => json!({ "verdict": "skipped" }),
        Verdict::Blocked => json!({ "verdict": "blocked" }),
        Verdict::Failed(err) => json!({ "verdict": "failed", "error": err }),
    }
}

fn print_result(capability: CapabilityKind, result: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if result.is_null() {
                println!("ok");
            } else {
                println!("{}", serde_json::to_string_pretty(result)?);
            }
        }
        OutputFormat::Json => {
            let name = format!("{:?}", capability).to_lowercase();
            println!("{}", json!({ "capability": name, "result": result }));
        }
    }
    Ok(())
}
