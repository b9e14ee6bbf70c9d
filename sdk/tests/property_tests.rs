use drover_sdk::{admission, environ, validator, webhook, PluginError};
use proptest::prelude::*;

// Envelopes must decode with any subset of their fields present; absent
// fields become zero values instead of decode errors.
proptest! {
    #[test]
    fn test_admission_envelope_partial_fields(
        event in proptest::option::of("login|register"),
        login in proptest::option::of("[a-z]{1,12}"),
        admin in proptest::option::of(any::<bool>()),
    ) {
        let mut user = serde_json::Map::new();
        if let Some(login) = &login {
            user.insert("login".into(), serde_json::json!(login));
        }
        if let Some(admin) = admin {
            user.insert("admin".into(), serde_json::json!(admin));
        }
        let mut envelope = serde_json::Map::new();
        if let Some(event) = &event {
            envelope.insert("event".into(), serde_json::json!(event));
        }
        envelope.insert("user".into(), serde_json::Value::Object(user));

        let req: admission::Request = serde_json::from_value(serde_json::Value::Object(envelope))
            .expect("partial envelope should decode");

        prop_assert_eq!(req.event, event.unwrap_or_default());
        prop_assert_eq!(req.user.login, login.unwrap_or_default());
        prop_assert_eq!(req.user.admin, admin.unwrap_or(false));
    }

    #[test]
    fn test_plugin_error_json_round_trip(code in 400u16..600, message in "\\PC*") {
        let err = PluginError::with_code(code, message);
        let json = serde_json::to_vec(&err).unwrap();
        let decoded: PluginError = serde_json::from_slice(&json).unwrap();
        prop_assert_eq!(decoded, err);
    }
}

#[test]
fn test_null_nested_objects_decode_to_defaults() {
    let req: environ::Request = serde_json::from_str(r#"{"repo":null,"build":null}"#).unwrap();
    assert_eq!(req.repo, Default::default());
    assert_eq!(req.build, Default::default());

    let req: validator::Request = serde_json::from_str(r#"{"config":null}"#).unwrap();
    assert!(req.config.data.is_empty());
}

#[test]
fn test_empty_object_decodes() {
    let req: webhook::Request = serde_json::from_str("{}").unwrap();
    assert!(req.event.is_empty());
    assert!(req.user.is_none());
    assert!(req.system.is_none());
}

#[test]
fn test_webhook_omits_absent_objects() {
    let req = webhook::Request {
        event: webhook::EVENT_REPO.to_string(),
        action: webhook::ACTION_ENABLED.to_string(),
        ..Default::default()
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json, serde_json::json!({"event": "repo", "action": "enabled"}));
}
