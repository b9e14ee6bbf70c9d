//! Cryptographic operations module
//!
//! This module provides the primitives shared by callers and plugins:
//! - HMAC-SHA256 request signatures over a fixed header set and body digest
//! - AES-GCM encryption of response bodies, opted into per call
//! - The shared secret that keys both
//!
//! # Security
//!
//! The shared secret never leaves this process. Signature verification and
//! decryption fail uniformly, so a peer learns nothing about which check
//! rejected its message.

/// AES-GCM payload encryption
pub mod aesgcm;

/// Shared secret handling
pub mod secret;

/// HMAC request signatures
pub mod signature;

pub use aesgcm::{decrypt, encrypt, CipherError, Key};
pub use secret::SharedSecret;
pub use signature::{check_date, digest, http_date, sign, Signature, SignatureError};
