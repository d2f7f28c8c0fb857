//! Ed25519 key encoding and HTTP request signing.
//!
//! A user's credential is an Ed25519 key pair. The public half is stored on
//! the profile as a multibase string:
//!
//! ```text
//! z <base58btc( [0xed, 0x01] ++ public_key_bytes )>
//! ```
//!
//! where `[0xed, 0x01]` is the unsigned-varint `ed25519-pub` multicodec.
//! Requests are signed over `(request-target) host date` and the server
//! resolves the acting user from `keyId`.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use thiserror::Error;

const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// Errors returned by [`decode_public_key`] and [`decode_signature`].
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("multibase value must start with 'z'")]
    MissingPrefix,
    #[error("base58 decoding failed: {0}")]
    Base58(String),
    #[error("missing ed25519 multicodec prefix [0xed, 0x01]")]
    WrongMulticodec,
    #[error("expected {expected} bytes, got {got}")]
    WrongLength { expected: usize, got: usize },
    #[error("invalid Ed25519 key: {0}")]
    InvalidKey(String),
}

/// Encode a verifying key as a `z`-prefixed multibase string.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    let mut bytes = ED25519_MULTICODEC.to_vec();
    bytes.extend_from_slice(&key.to_bytes());
    format!("z{}", bs58::encode(bytes).into_string())
}

/// Decode a `z`-prefixed multibase Ed25519 public key.
pub fn decode_public_key(multibase: &str) -> Result<VerifyingKey, KeyError> {
    let b58 = multibase.strip_prefix('z').ok_or(KeyError::MissingPrefix)?;
    let decoded = bs58::decode(b58)
        .into_vec()
        .map_err(|e| KeyError::Base58(e.to_string()))?;

    let raw = decoded
        .strip_prefix(&ED25519_MULTICODEC[..])
        .ok_or(KeyError::WrongMulticodec)?;

    let key_bytes: [u8; 32] = raw.try_into().map_err(|_| KeyError::WrongLength {
        expected: 32,
        got: raw.len(),
    })?;

    VerifyingKey::from_bytes(&key_bytes).map_err(|e| KeyError::InvalidKey(e.to_string()))
}

/// Encode a signature as `z` + base58btc(64 raw bytes).
pub fn encode_signature(sig: &ed25519_dalek::Signature) -> String {
    format!("z{}", bs58::encode(sig.to_bytes()).into_string())
}

/// Decode a `z`-prefixed base58btc signature.
pub fn decode_signature(value: &str) -> Result<ed25519_dalek::Signature, KeyError> {
    let b58 = value.strip_prefix('z').ok_or(KeyError::MissingPrefix)?;
    let bytes = bs58::decode(b58)
        .into_vec()
        .map_err(|e| KeyError::Base58(e.to_string()))?;
    let arr: [u8; 64] = bytes.as_slice().try_into().map_err(|_| KeyError::WrongLength {
        expected: 64,
        got: bytes.len(),
    })?;
    Ok(ed25519_dalek::Signature::from_bytes(&arr))
}

/// The canonical signing string for `(request-target) host date`.
///
/// `method` is lowercased; `path` includes the query string, if any.
pub fn signing_string(method: &str, path: &str, host: &str, date: &str) -> String {
    format!(
        "(request-target): {} {path}\nhost: {host}\ndate: {date}",
        method.to_lowercase()
    )
}

/// Build `Date` and `Signature` header values for a request made as `key_id`.
///
/// Returns `(date_header_value, signature_header_value)`.
pub fn sign_request(
    signing_key: &SigningKey,
    key_id: &str,
    method: &str,
    path: &str,
    host: &str,
) -> (String, String) {
    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    let payload = signing_string(method, path, host, &date);
    let signature = encode_signature(&signing_key.sign(payload.as_bytes()));
    let header = format!(
        r#"keyId="{key_id}",algorithm="ed25519",headers="(request-target) host date",signature="{signature}""#
    );
    (date, header)
}
