//! Integration tests for the outbound caller
//!
//! Validates status mapping, decryption, redirects and cancellation using
//! mock servers

use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use wiremock::{
    matchers::{header, header_exists, method},
    Mock, MockServer, ResponseTemplate,
};

use drover::client::ClientBuilder;
use drover::crypto::aesgcm::{self, Key};
use drover::crypto::SharedSecret;
use drover::error::{ClientError, ErrorExt, ErrorKind};
use drover::plugin::{admission, config, environ, registry, validator, webhook};
use sdk::{Context, PluginError, Verdict};

const SECRET: &str = "xVKAGlWQiY3sOp8JVc0nbuNId3PNCgWh";

fn secret() -> SharedSecret {
    SharedSecret::new(SECRET)
}

async fn mock_response(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

async fn validate_against(response: ResponseTemplate) -> Result<Verdict, ClientError> {
    let server = mock_response(response).await;
    let client = validator::Client::new(&server.uri(), secret(), false).unwrap();
    client
        .validate(&Context::background(), &sdk::validator::Request::default())
        .await
}

#[tokio::test]
async fn test_request_is_signed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("accept", sdk::validator::V1))
        .and(header("accept-encoding", "identity"))
        .and(header("content-type", "application/json"))
        .and(header_exists("date"))
        .and(header_exists("digest"))
        .and(header_exists("signature"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = validator::Client::new(&server.uri(), secret(), false).unwrap();
    let verdict = client
        .validate(&Context::background(), &sdk::validator::Request::default())
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Accepted);

    let requests = server.received_requests().await.unwrap();
    let signature = requests[0].headers.get("signature").unwrap().to_str().unwrap();
    assert!(signature.contains(r#"keyId="hmac-key""#));
    assert!(signature.contains(r#"headers="accept accept-encoding content-type date digest""#));
}

#[tokio::test]
async fn test_validator_skip_and_block() {
    let verdict = validate_against(ResponseTemplate::new(498).set_body_string("skip")).await;
    assert_eq!(verdict.unwrap(), Verdict::Skipped);

    let verdict = validate_against(ResponseTemplate::new(499)).await;
    assert_eq!(verdict.unwrap(), Verdict::Blocked);
}

#[tokio::test]
async fn test_validator_failed() {
    let body = json!({"code": 400, "message": "privileged containers are not allowed"});
    let verdict = validate_against(ResponseTemplate::new(400).set_body_json(body)).await;
    assert_eq!(
        verdict.unwrap(),
        Verdict::Failed(PluginError::new("privileged containers are not allowed"))
    );
}

#[tokio::test]
async fn test_validator_failed_keeps_code() {
    let body = json!({"code": 422, "message": "unprocessable pipeline"});
    let verdict = validate_against(ResponseTemplate::new(400).set_body_json(body)).await;
    assert_eq!(
        verdict.unwrap(),
        Verdict::Failed(PluginError::with_code(422, "unprocessable pipeline"))
    );
}

#[tokio::test]
async fn test_validator_failed_with_skeleton_message() {
    let body = json!({"code": 400, "message": "Invalid Input"});
    let verdict = validate_against(ResponseTemplate::new(400).set_body_json(body)).await;
    assert_eq!(verdict.unwrap(), Verdict::Failed(PluginError::new("Invalid Input")));

    // A JSON error without a content type is still a capability error.
    let raw = ResponseTemplate::new(400)
        .set_body_raw(r#"{"code":400,"message":"Invalid Signature"}"#, "text/plain");
    let verdict = validate_against(raw).await;
    assert_eq!(verdict.unwrap(), Verdict::Failed(PluginError::new("Invalid Signature")));
}

#[tokio::test]
async fn test_validator_signature_rejection_stays_an_error() {
    let err = validate_against(ResponseTemplate::new(400).set_body_string("Invalid Signature"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_error_status_uses_body() {
    let server = mock_response(ResponseTemplate::new(403).set_body_string("access denied\n")).await;
    let client = admission::Client::new(&server.uri(), secret(), false).unwrap();

    let err = client
        .admit(&Context::background(), &sdk::admission::Request::default())
        .await
        .unwrap_err();
    assert_eq!(err.plugin_error(), Some(&PluginError::access_denied("access denied")));
    assert_eq!(err.kind(), ErrorKind::Capability);
}

#[tokio::test]
async fn test_error_status_falls_back_to_status_text() {
    let server = mock_response(ResponseTemplate::new(500)).await;
    let client = webhook::Client::new(&server.uri(), secret(), false).unwrap();

    let err = client
        .deliver(&Context::background(), &sdk::webhook::Request::default())
        .await
        .unwrap_err();
    assert_eq!(err.plugin_error(), Some(&PluginError::internal("Internal Server Error")));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_no_content_returns_none() {
    let server = mock_response(ResponseTemplate::new(204)).await;
    let client = admission::Client::new(&server.uri(), secret(), false).unwrap();

    let user = client
        .admit(&Context::background(), &sdk::admission::Request::default())
        .await
        .unwrap();
    assert!(user.is_none());
}

fn null_body() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw("null", "application/json")
}

#[tokio::test]
async fn test_null_body_is_empty_result() {
    let server = mock_response(null_body()).await;
    let ctx = Context::background();

    let client = registry::Client::new(&server.uri(), secret(), false).unwrap();
    let registries = client.list(&ctx, &sdk::registry::Request::default()).await.unwrap();
    assert!(registries.is_empty());

    let client = environ::Client::new(&server.uri(), secret(), false).unwrap();
    let env = client.list(&ctx, &sdk::environ::Request::default()).await.unwrap();
    assert!(env.is_empty());

    let client = config::Client::new(&server.uri(), secret(), false).unwrap();
    let found = client.find(&ctx, &sdk::config::Request::default()).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_null_members_decode_to_defaults() {
    let body = r#"[{"address":"docker.io","username":null,"password":null}]"#;
    let server =
        mock_response(ResponseTemplate::new(200).set_body_raw(body, "application/json")).await;

    let client = registry::Client::new(&server.uri(), secret(), false).unwrap();
    let registries = client
        .list(&Context::background(), &sdk::registry::Request::default())
        .await
        .unwrap();
    assert_eq!(registries[0].address, "docker.io");
    assert!(registries[0].username.is_empty());
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let target = mock_response(ResponseTemplate::new(200).set_body_json(json!({"A": "B"}))).await;
    let server = mock_response(
        ResponseTemplate::new(302).insert_header("location", target.uri().as_str()),
    )
    .await;

    let client = environ::Client::new(&server.uri(), secret(), false).unwrap();
    let err = client
        .list(&Context::background(), &sdk::environ::Request::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(302));
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(target.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_encrypted_response() {
    let key = Key::derive(&secret()).unwrap();
    let sealed = aesgcm::encrypt(br#"{"GOOS":"linux"}"#, &key).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("accept-encoding", "aesgcm"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "aesgcm")
                .set_body_raw(sealed, "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let builder = ClientBuilder::new(server.uri(), secret()).encrypt(true);
    let client = environ::Client::from_builder(builder).unwrap();
    let env = client
        .list(&Context::background(), &sdk::environ::Request::default())
        .await
        .unwrap();

    assert_eq!(env, HashMap::from([("GOOS".to_string(), "linux".to_string())]));
}

#[tokio::test]
async fn test_tampered_ciphertext() {
    let key = Key::derive(&secret()).unwrap();
    let mut sealed = aesgcm::encrypt(br#"{"GOOS":"linux"}"#, &key).unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;

    let server = mock_response(
        ResponseTemplate::new(200)
            .insert_header("content-encoding", "aesgcm")
            .set_body_raw(sealed, "application/octet-stream"),
    )
    .await;

    let builder = ClientBuilder::new(server.uri(), secret()).encrypt(true);
    let client = environ::Client::from_builder(builder).unwrap();
    let err = client
        .list(&Context::background(), &sdk::environ::Request::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Crypto(_)));
    assert_eq!(err.kind(), ErrorKind::Crypto);
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = mock_response(ResponseTemplate::new(200).set_body_string("not json")).await;
    let client = environ::Client::new(&server.uri(), secret(), false).unwrap();

    let err = client
        .list(&Context::background(), &sdk::environ::Request::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_response_limit() {
    let oversized = ResponseTemplate::new(200).set_body_string("x".repeat(64 * 1024));
    let server = mock_response(oversized).await;
    let builder = ClientBuilder::new(server.uri(), secret()).response_limit(1024);
    let client = environ::Client::from_builder(builder).unwrap();

    let err = client
        .list(&Context::background(), &sdk::environ::Request::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ResponseTooLarge { limit: 1024 }));
}

#[tokio::test]
async fn test_cancellation_aborts_call() {
    let server = mock_response(ResponseTemplate::new(204).set_delay(Duration::from_secs(10))).await;
    let client = webhook::Client::new(&server.uri(), secret(), false).unwrap();

    let ctx = Context::background();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = client
        .deliver(&ctx, &sdk::webhook::Request::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let server = mock_response(ResponseTemplate::new(204).set_delay(Duration::from_secs(10))).await;
    let client = webhook::Client::new(&server.uri(), secret(), false).unwrap();

    let ctx = Context::background().with_timeout(Duration::from_millis(50));
    let err = client
        .deliver(&ctx, &sdk::webhook::Request::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::DeadlineExceeded));
}

#[tokio::test]
async fn test_already_cancelled_context_sends_nothing() {
    let server = mock_response(ResponseTemplate::new(204)).await;
    let client = webhook::Client::new(&server.uri(), secret(), false).unwrap();

    let ctx = Context::background();
    ctx.cancel();
    let err = client
        .deliver(&ctx, &sdk::webhook::Request::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Cancelled));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_client_timeout() {
    let server = mock_response(ResponseTemplate::new(204).set_delay(Duration::from_secs(10))).await;
    let builder =
        ClientBuilder::new(server.uri(), secret()).timeout(Some(Duration::from_millis(100)));
    let client = webhook::Client::from_builder(builder).unwrap();

    let err = client
        .deliver(&Context::background(), &sdk::webhook::Request::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout));
    assert!(err.is_recoverable());
}
