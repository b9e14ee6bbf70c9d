//! Lenient JSON decoding
//!
//! Peers written against the same protocol in other languages send `null`
//! for empty lists, maps and unset fields. Decoding through this module
//! treats an explicit `null` object member exactly like an absent one, at
//! any depth, so the field falls back to its default.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode JSON bytes, ignoring `null` object members.
///
/// A top-level `null` is kept, so decoding into `Option<T>` yields `None`.
///
/// ```
/// use drover_sdk::{codec, webhook};
///
/// let body = br#"{"event":null,"action":"created"}"#;
/// let req: webhook::Request = codec::from_slice(body).unwrap();
/// assert!(req.event.is_empty());
///
/// let none: Option<Vec<String>> = codec::from_slice(b"null").unwrap();
/// assert!(none.is_none());
/// ```
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let mut value: Value = serde_json::from_slice(bytes)?;
    strip_nulls(&mut value);
    serde_json::from_value(value)
}

/// Decode a JSON string, ignoring `null` object members
pub fn from_str<T: DeserializeOwned>(s: &str) -> serde_json::Result<T> {
    from_slice(s.as_bytes())
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(members) => {
            members.retain(|_, member| !member.is_null());
            members.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Build;
    use std::collections::HashMap;

    #[test]
    fn test_null_scalars_and_collections() {
        let build: Build =
            from_str(r#"{"number":7,"event":null,"params":null,"stages":null}"#).unwrap();
        assert_eq!(build.number, 7);
        assert!(build.event.is_empty());
        assert!(build.params.is_empty());
        assert!(build.stages.is_empty());
    }

    #[test]
    fn test_nested_nulls() {
        let build: Build =
            from_str(r#"{"stages":[{"name":"default","steps":null,"labels":null}]}"#).unwrap();
        assert_eq!(build.stages[0].name, "default");
        assert!(build.stages[0].steps.is_empty());
    }

    #[test]
    fn test_top_level_null() {
        let env: Option<HashMap<String, String>> = from_str("null").unwrap();
        assert!(env.is_none());

        let env: Option<HashMap<String, String>> = from_str(r#"{"GOOS":"linux"}"#).unwrap();
        assert_eq!(env.unwrap()["GOOS"], "linux");
    }

    #[test]
    fn test_malformed_input_still_fails() {
        assert!(from_str::<Build>("{").is_err());
        assert!(from_str::<Build>(r#"{"number":"seven"}"#).is_err());
    }
}
