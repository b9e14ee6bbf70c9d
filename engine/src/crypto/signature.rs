//! HMAC request signatures
//!
//! Requests between a core service and a plugin carry a `Signature` header in
//! the draft-cavage HTTP signature format:
//!
//! ```text
//! Signature: keyId="hmac-key",algorithm="hmac-sha256",
//!   headers="accept accept-encoding content-type date digest",signature="<base64>"
//! ```
//!
//! The signing string is built from the covered headers, one `name: value`
//! line per header, joined by `\n`. A `Digest` header over the body is itself
//! covered, so the signature binds the body too. The method and path are left
//! out when signing because proxies rewrite them; a verifier still accepts a
//! `(request-target)` entry from peers that sign it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use http::header::{AUTHORIZATION, DATE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use sha2::{Digest as _, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::SharedSecret;

type HmacSha256 = Hmac<Sha256>;

/// Key identifier shared by convention; never negotiated
pub const KEY_ID: &str = "hmac-key";

/// The only supported signature algorithm
pub const ALGORITHM: &str = "hmac-sha256";

/// Headers covered by every outbound signature, in signing order
pub const SIGNED_HEADERS: [&str; 5] =
    ["accept", "accept-encoding", "content-type", "date", "digest"];

/// Pseudo-header for the lowercased method and path
pub const REQUEST_TARGET: &str = "(request-target)";

/// Name of the body digest header
pub const DIGEST_HEADER: &str = "digest";

/// Name of the signature header
pub const SIGNATURE_HEADER: &str = "signature";

/// Errors produced while signing or parsing signatures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing signature")]
    Missing,

    #[error("Malformed signature: {0}")]
    Malformed(String),

    #[error("Missing signed header: {0}")]
    MissingHeader(String),

    #[error("Invalid value for header: {0}")]
    InvalidHeaderValue(String),

    #[error("Date header is outside the allowed clock skew")]
    Stale,

    #[error("Invalid signing key")]
    InvalidKey,
}

/// Compute the `Digest` header value for a body: `SHA-256=<base64>`
pub fn digest(body: &[u8]) -> String {
    format!("SHA-256={}", STANDARD.encode(Sha256::digest(body)))
}

/// Format a timestamp as an RFC 1123 `Date` header value
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Sign an outbound request.
///
/// Stamps `Digest` over `body`, stamps `Date` when the caller has not set one,
/// then signs the fixed header set and inserts the `Signature` header. Every
/// other covered header (`Accept`, `Accept-Encoding`, `Content-Type`) must
/// already be present.
pub fn sign(
    secret: &SharedSecret,
    headers: &mut HeaderMap,
    body: &[u8],
) -> Result<(), SignatureError> {
    let digest_value = HeaderValue::from_str(&digest(body))
        .map_err(|_| SignatureError::InvalidHeaderValue(DIGEST_HEADER.to_string()))?;
    headers.insert(HeaderName::from_static(DIGEST_HEADER), digest_value);

    if !headers.contains_key(DATE) {
        let date = HeaderValue::from_str(&http_date(Utc::now()))
            .map_err(|_| SignatureError::InvalidHeaderValue("date".to_string()))?;
        headers.insert(DATE, date);
    }

    let names: Vec<String> = SIGNED_HEADERS.iter().map(|name| name.to_string()).collect();
    let signing_string = signing_string(&names, None, headers)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(signing_string.as_bytes());

    let signature = Signature {
        key_id: KEY_ID.to_string(),
        algorithm: ALGORITHM.to_string(),
        headers: names,
        signature: mac.finalize().into_bytes().to_vec(),
    };

    let value = HeaderValue::from_str(&signature.to_header_value())
        .map_err(|_| SignatureError::InvalidHeaderValue(SIGNATURE_HEADER.to_string()))?;
    headers.insert(HeaderName::from_static(SIGNATURE_HEADER), value);

    debug!("Signed request over {} headers", SIGNED_HEADERS.len());
    Ok(())
}

/// Check that the `Date` header lies within `max_skew` of `now`
pub fn check_date(
    headers: &HeaderMap,
    max_skew: Duration,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let value = headers
        .get(DATE)
        .ok_or_else(|| SignatureError::MissingHeader("date".to_string()))?
        .to_str()
        .map_err(|_| SignatureError::InvalidHeaderValue("date".to_string()))?;

    let date = DateTime::parse_from_rfc2822(value)
        .map_err(|_| SignatureError::InvalidHeaderValue("date".to_string()))?
        .with_timezone(&Utc);

    let skew = (now - date).num_seconds().unsigned_abs();
    if skew > max_skew.as_secs() {
        debug!("Request date is {}s away from local clock", skew);
        return Err(SignatureError::Stale);
    }

    Ok(())
}

/// A parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub key_id: String,
    pub algorithm: String,
    /// Covered header names, lowercased, in signing order
    pub headers: Vec<String>,
    /// Raw MAC bytes
    pub signature: Vec<u8>,
}

impl Signature {
    /// Read the signature from a request's headers.
    ///
    /// Looks at `Signature` first, then at `Authorization: Signature ...`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, SignatureError> {
        if let Some(value) = headers.get(SIGNATURE_HEADER) {
            let value = value
                .to_str()
                .map_err(|_| SignatureError::Malformed("header is not valid text".to_string()))?;
            return Self::parse(value);
        }

        if let Some(value) = headers.get(AUTHORIZATION) {
            if let Ok(value) = value.to_str() {
                if let Some(params) = strip_scheme(value) {
                    return Self::parse(params);
                }
            }
        }

        Err(SignatureError::Missing)
    }

    /// Parse the parameter list of a signature header
    pub fn parse(value: &str) -> Result<Self, SignatureError> {
        let mut key_id = None;
        let mut algorithm = None;
        let mut headers = None;
        let mut signature = None;

        for (name, param) in parse_params(value)? {
            match name.as_str() {
                "keyId" => key_id = Some(param),
                "algorithm" => algorithm = Some(param),
                "headers" => headers = Some(param),
                "signature" => signature = Some(param),
                _ => {}
            }
        }

        let key_id = key_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SignatureError::Malformed("missing keyId".to_string()))?;
        let algorithm = algorithm
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SignatureError::Malformed("missing algorithm".to_string()))?;
        let signature = signature
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SignatureError::Malformed("missing signature".to_string()))?;
        let signature = STANDARD
            .decode(signature)
            .map_err(|_| SignatureError::Malformed("signature is not base64".to_string()))?;

        let headers = match headers {
            Some(list) if !list.trim().is_empty() => {
                list.split_whitespace().map(|name| name.to_ascii_lowercase()).collect()
            }
            _ => vec!["date".to_string()],
        };

        Ok(Self {
            key_id,
            algorithm,
            headers,
            signature,
        })
    }

    /// Render the header value
    pub fn to_header_value(&self) -> String {
        format!(
            "keyId=\"{}\",algorithm=\"{}\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            self.algorithm,
            self.headers.join(" "),
            STANDARD.encode(&self.signature)
        )
    }

    /// Verify this signature against a received request.
    ///
    /// Every failure yields `false`, with no indication of which check failed.
    pub fn is_valid(
        &self,
        secret: &SharedSecret,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> bool {
        if !self.algorithm.eq_ignore_ascii_case(ALGORITHM) {
            debug!("Unsupported signature algorithm: {}", self.algorithm);
            return false;
        }

        if !self.covers("date") || !self.covers(DIGEST_HEADER) {
            debug!("Signature does not cover date and digest");
            return false;
        }

        let presented = headers.get(DIGEST_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(digest(body).as_str()) {
            debug!("Digest header does not match body");
            return false;
        }

        let signing_string = match signing_string(&self.headers, Some((method, path)), headers) {
            Ok(s) => s,
            Err(e) => {
                debug!("Cannot build signing string: {}", e);
                return false;
            }
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(signing_string.as_bytes());
        mac.verify_slice(&self.signature).is_ok()
    }

    fn covers(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

fn signing_string(
    names: &[String],
    target: Option<(&Method, &str)>,
    headers: &HeaderMap,
) -> Result<String, SignatureError> {
    let mut lines = Vec::with_capacity(names.len());

    for name in names {
        if name == REQUEST_TARGET {
            let (method, path) = target.ok_or_else(|| SignatureError::MissingHeader(name.clone()))?;
            lines.push(format!(
                "{}: {} {}",
                REQUEST_TARGET,
                method.as_str().to_ascii_lowercase(),
                path
            ));
            continue;
        }

        let value = headers
            .get(name.as_str())
            .ok_or_else(|| SignatureError::MissingHeader(name.clone()))?
            .to_str()
            .map_err(|_| SignatureError::InvalidHeaderValue(name.clone()))?;
        lines.push(format!("{}: {}", name, value));
    }

    Ok(lines.join("\n"))
}

fn strip_scheme(value: &str) -> Option<&str> {
    let (scheme, rest) = value.trim_start().split_once(' ')?;
    scheme.eq_ignore_ascii_case("signature").then_some(rest.trim_start())
}

/// Split `a="x",b="y",c=z` into name/value pairs
fn parse_params(input: &str) -> Result<Vec<(String, String)>, SignatureError> {
    let mut params = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let (name, after) = rest
            .split_once('=')
            .ok_or_else(|| SignatureError::Malformed(format!("expected '=' in {:?}", rest)))?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(SignatureError::Malformed("empty parameter name".to_string()));
        }

        let after = after.trim_start();
        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            let end = quoted.find('"').ok_or_else(|| {
                SignatureError::Malformed(format!("unterminated value for {}", name))
            })?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            match after.find(',') {
                Some(end) => (after[..end].trim(), &after[end..]),
                None => (after.trim(), ""),
            }
        };

        params.push((name, value.to_string()));

        let remaining = remaining.trim_start();
        rest = match remaining.strip_prefix(',') {
            Some(next) => next.trim_start(),
            None if remaining.is_empty() => "",
            None => {
                return Err(SignatureError::Malformed(format!(
                    "unexpected trailing input {:?}",
                    remaining
                )))
            }
        };
    }

    Ok(params)
}
