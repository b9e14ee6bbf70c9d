//! AES-GCM payload encryption
//!
//! When a caller sends `Accept-Encoding: aesgcm`, a plugin encrypts its
//! response body with a key taken directly from the shared secret. The output
//! layout is `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::SharedSecret;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Name of the content coding for encrypted bodies
pub const ENCODING: &str = "aesgcm";

/// Size of the random nonce prepended to every ciphertext
pub const NONCE_SIZE: usize = 12;

/// Supported key sizes in bytes (AES-128, AES-192, AES-256)
pub const KEY_SIZES: [usize; 3] = [16, 24, 32];

/// Errors produced by the cipher.
///
/// Decryption failures are deliberately uniform: a short input, a bad tag and
/// a wrong key all yield [`CipherError::DecryptionFailed`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    #[error("Invalid key length")]
    InvalidKeyLength,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed")]
    DecryptionFailed,
}

/// An AES key. The bytes are wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    bytes: Vec<u8>,
}

impl Key {
    /// Use the shared secret as key material.
    ///
    /// The secret must be exactly 16, 24 or 32 bytes long. It is never
    /// truncated or padded.
    pub fn derive(secret: &SharedSecret) -> Result<Self, CipherError> {
        Self::from_bytes(secret.as_bytes())
    }

    /// Build a key from raw bytes of a supported length
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        if !KEY_SIZES.contains(&bytes.len()) {
            return Err(CipherError::InvalidKeyLength);
        }
        Ok(Self { bytes: bytes.to_vec() })
    }

    /// Key size in bits
    pub fn bits(&self) -> usize {
        self.bytes.len() * 8
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(AES-{}, [REDACTED])", self.bits())
    }
}

/// Encrypt `plaintext` under a fresh random nonce
pub fn encrypt(plaintext: &[u8], key: &Key) -> Result<Vec<u8>, CipherError> {
    match key.bytes.len() {
        16 => seal::<Aes128Gcm>(&key.bytes, plaintext),
        24 => seal::<Aes192Gcm>(&key.bytes, plaintext),
        32 => seal::<Aes256Gcm>(&key.bytes, plaintext),
        _ => Err(CipherError::InvalidKeyLength),
    }
}

/// Decrypt data produced by [`encrypt`]
pub fn decrypt(data: &[u8], key: &Key) -> Result<Vec<u8>, CipherError> {
    match key.bytes.len() {
        16 => open::<Aes128Gcm>(&key.bytes, data),
        24 => open::<Aes192Gcm>(&key.bytes, data),
        32 => open::<Aes256Gcm>(&key.bytes, data),
        _ => Err(CipherError::InvalidKeyLength),
    }
}

fn seal<C>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CipherError>
where
    C: Aead + AeadCore<NonceSize = U12> + KeyInit,
{
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
    let nonce = C::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CipherError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open<C>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CipherError>
where
    C: Aead + AeadCore<NonceSize = U12> + KeyInit,
{
    if data.len() < NONCE_SIZE {
        return Err(CipherError::DecryptionFailed);
    }

    let cipher = C::new_from_slice(key).map_err(|_| CipherError::DecryptionFailed)?;
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    cipher
        .decrypt(Nonce::<U12>::from_slice(nonce), ciphertext)
        .map_err(|_| CipherError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_key_sizes() {
        for size in KEY_SIZES {
            let key = Key::from_bytes(&vec![7u8; size]).unwrap();
            let sealed = encrypt(b"hello world", &key).unwrap();
            assert_eq!(sealed.len(), NONCE_SIZE + 11 + 16);
            assert_eq!(decrypt(&sealed, &key).unwrap(), b"hello world");
        }
    }

    #[test]
    fn test_invalid_key_lengths() {
        for size in [0, 1, 15, 17, 31, 33, 64] {
            assert_eq!(
                Key::from_bytes(&vec![1u8; size]).unwrap_err(),
                CipherError::InvalidKeyLength
            );
        }
        let secret = SharedSecret::new("too-short");
        assert_eq!(Key::derive(&secret).unwrap_err(), CipherError::InvalidKeyLength);
    }

    #[test]
    fn test_nonce_is_fresh() {
        let key = Key::derive(&SharedSecret::new("xVKAGlWQiY3sOp8JVc0nbuNId3PNCgWh")).unwrap();
        let a = encrypt(b"same", &key).unwrap();
        let b = encrypt(b"same", &key).unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = Key::from_bytes(&[1u8; 32]).unwrap();
        let other = Key::from_bytes(&[2u8; 32]).unwrap();
        let sealed = encrypt(b"payload", &key).unwrap();
        assert_eq!(decrypt(&sealed, &other), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn test_short_input_fails() {
        let key = Key::from_bytes(&[1u8; 16]).unwrap();
        assert_eq!(decrypt(&[0u8; 5], &key), Err(CipherError::DecryptionFailed));
        assert_eq!(decrypt(&[0u8; NONCE_SIZE], &key), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = Key::from_bytes(&[9u8; 24]).unwrap();
        assert_eq!(format!("{:?}", key), "Key(AES-192, [REDACTED])");
    }
}
