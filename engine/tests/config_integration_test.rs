//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from a TOML
//! file, validated, and turned into clients and handlers.

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use drover::config::{Config, ConfigError};
use drover::crypto::SharedSecret;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_load_full_config() {
    let (_dir, path) = write_config(
        r#"
secret = "xVKAGlWQiY3sOp8JVc0nbuNId3PNCgWh"

[core]
log_level = "debug"

[client]
endpoint = "http://127.0.0.1:3000"
timeout_secs = 5
encrypt = true

[server]
bind = "0.0.0.0:3100"
max_clock_skew_secs = 300

[static.env]
GOOS = "linux"
GOARCH = "amd64"

[[static.registries]]
address = "docker.io"
username = "octocat"
password = "correct-horse-battery-staple"
"#,
    );

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.client.endpoint.as_deref(), Some("http://127.0.0.1:3000"));
    assert_eq!(config.client.timeout_secs, 5);
    assert!(config.client.encrypt);
    assert!(!config.client.skip_verify);
    assert_eq!(config.bind_addr().unwrap().port(), 3100);
    assert_eq!(config.max_clock_skew(), Some(Duration::from_secs(300)));
    assert_eq!(config.fixed.env.get("GOARCH").map(String::as_str), Some("amd64"));
    assert_eq!(config.fixed.registries[0].username, "octocat");
    assert_eq!(
        config.secret,
        Some(SharedSecret::new("xVKAGlWQiY3sOp8JVc0nbuNId3PNCgWh"))
    );
}

#[test]
fn test_minimal_config_uses_defaults() {
    let (_dir, path) = write_config("");
    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.client.timeout_secs, 60);
    assert_eq!(config.server.bind, "127.0.0.1:3000");
    assert!(config.max_clock_skew().is_none());
    assert!(config.fixed.env.is_empty());
}

#[test]
fn test_client_builder_from_config() {
    let (_dir, path) = write_config(
        r#"
secret = "xVKAGlWQiY3sOp8JVc0nbuNId3PNCgWh"

[client]
endpoint = "http://127.0.0.1:3000"
encrypt = true
"#,
    );
    let config = Config::load_from_path(&path).unwrap();
    let secret = config.secret.clone().unwrap();

    let client = config.client_builder(secret.clone(), None).unwrap().build().unwrap();
    assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:3000/");
    assert!(client.encrypts());

    let client = config
        .client_builder(secret, Some("http://plugin.local/"))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(client.endpoint().host_str(), Some("plugin.local"));
}

#[test]
fn test_parse_error() {
    let (_dir, path) = write_config("[client\nendpoint = ");
    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_invalid_bind_address() {
    let (_dir, path) = write_config("[server]\nbind = \"not-an-address\"\n");
    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    match Config::load_from_path(&path) {
        Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected read error, got {:?}", other),
    }
}
