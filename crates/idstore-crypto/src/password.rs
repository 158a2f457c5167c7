//! Encoded configuration passwords
//!
//! Passwords in configuration may be stored as:
//! - plain text
//! - `{xor}<base64>`: every byte XORed with `_`, then base64 encoded
//! - `{aes}<base64>`: AES-256-GCM, nonce prepended to the ciphertext, key
//!   derived from a passphrase with SHA-256
//!
//! The `{tag}` prefix versions the scheme, so a value is always decoded the
//! same way regardless of which schemes are enabled later.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use digest::Digest;
use sha2::Sha256;
use thiserror::Error;

const XOR_MASK: u8 = b'_';
const NONCE_LEN: usize = 12;

/// Password decoding errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid base64 in {0} password: {1}")]
    InvalidBase64(&'static str, String),

    #[error("Decoded {0} password is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("An {{aes}} password requires a password key")]
    MissingKey,

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Password scheme cannot be decoded: {0}")]
    OneWay(String),
}

/// Password encoding scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    Plain,
    Xor,
    Aes,
}

impl PasswordScheme {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::Xor => "{xor}",
            Self::Aes => "{aes}",
        }
    }

    /// Detect the scheme of an encoded value
    ///
    /// Unknown `{tag}` prefixes are treated as plain text, since a plain
    /// password may start with a brace.
    pub fn detect(value: &str) -> Self {
        if value.starts_with(Self::Xor.tag()) {
            Self::Xor
        } else if value.starts_with(Self::Aes.tag()) {
            Self::Aes
        } else {
            Self::Plain
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "plain" | "none" => Some(Self::Plain),
            "xor" => Some(Self::Xor),
            "aes" => Some(Self::Aes),
            _ => None,
        }
    }
}

/// Decode a possibly encoded password
///
/// Surrounding whitespace is trimmed before decoding. `key` is only used for
/// `{aes}` values.
pub fn decode_password(encoded: &str, key: Option<&str>) -> Result<String, PasswordError> {
    let encoded = encoded.trim();

    if encoded.starts_with("{hash}") {
        return Err(PasswordError::OneWay("hash".into()));
    }

    match PasswordScheme::detect(encoded) {
        PasswordScheme::Plain => Ok(encoded.to_string()),
        PasswordScheme::Xor => decode_xor(&encoded[PasswordScheme::Xor.tag().len()..]),
        PasswordScheme::Aes => {
            let key = key.ok_or(PasswordError::MissingKey)?;
            decode_aes(&encoded[PasswordScheme::Aes.tag().len()..], key)
        }
    }
}

/// Encode a password with the given scheme
pub fn encode_password(
    plain: &str,
    scheme: PasswordScheme,
    key: Option<&str>,
) -> Result<String, PasswordError> {
    match scheme {
        PasswordScheme::Plain => Ok(plain.to_string()),
        PasswordScheme::Xor => {
            let masked: Vec<u8> = plain.bytes().map(|b| b ^ XOR_MASK).collect();
            Ok(format!("{}{}", scheme.tag(), STANDARD.encode(masked)))
        }
        PasswordScheme::Aes => {
            let key = key.ok_or(PasswordError::MissingKey)?;
            let cipher = cipher_for(key)?;
            let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
            let ciphertext = cipher
                .encrypt(&nonce, plain.as_bytes())
                .map_err(|e| PasswordError::EncryptionFailed(e.to_string()))?;

            let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
            payload.extend_from_slice(nonce.as_slice());
            payload.extend_from_slice(&ciphertext);
            Ok(format!("{}{}", scheme.tag(), STANDARD.encode(payload)))
        }
    }
}

fn decode_xor(body: &str) -> Result<String, PasswordError> {
    let bytes = STANDARD
        .decode(body)
        .map_err(|e| PasswordError::InvalidBase64("xor", e.to_string()))?;
    let unmasked: Vec<u8> = bytes.into_iter().map(|b| b ^ XOR_MASK).collect();
    String::from_utf8(unmasked).map_err(|_| PasswordError::InvalidUtf8("xor"))
}

fn decode_aes(body: &str, key: &str) -> Result<String, PasswordError> {
    let payload = STANDARD
        .decode(body)
        .map_err(|e| PasswordError::InvalidBase64("aes", e.to_string()))?;

    if payload.len() < NONCE_LEN {
        return Err(PasswordError::DecryptionFailed("payload too short".into()));
    }

    let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
    let cipher = cipher_for(key)?;
    let plain = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| PasswordError::DecryptionFailed(e.to_string()))?;

    String::from_utf8(plain).map_err(|_| PasswordError::InvalidUtf8("aes"))
}

/// Derive the AES-256 key from a passphrase
fn cipher_for(passphrase: &str) -> Result<Aes256Gcm, PasswordError> {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    let key = hasher.finalize();
    Aes256Gcm::new_from_slice(&key).map_err(|e| PasswordError::DecryptionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_passthrough() {
        assert_eq!(decode_password("  secret  ", None).unwrap(), "secret");
        assert_eq!(decode_password("{sha}abc", None).unwrap(), "{sha}abc");
    }

    #[test]
    fn test_xor_known_value() {
        // "admin" XOR '_' = 3E 3B 32 36 31
        assert_eq!(decode_password("{xor}PjsyNjE=", None).unwrap(), "admin");
        assert_eq!(
            encode_password("admin", PasswordScheme::Xor, None).unwrap(),
            "{xor}PjsyNjE="
        );
    }

    #[test]
    fn test_xor_empty_body_decodes_to_empty() {
        assert_eq!(decode_password("{xor}", None).unwrap(), "");
    }

    #[test]
    fn test_aes_requires_key() {
        let encoded = encode_password("s3cret", PasswordScheme::Aes, Some("passphrase")).unwrap();
        assert!(encoded.starts_with("{aes}"));

        assert!(matches!(
            decode_password(&encoded, None),
            Err(PasswordError::MissingKey)
        ));
        assert_eq!(decode_password(&encoded, Some("passphrase")).unwrap(), "s3cret");
        assert!(decode_password(&encoded, Some("wrong")).is_err());
    }

    #[test]
    fn test_hash_is_one_way() {
        assert!(matches!(
            decode_password("{hash}ARAAAAAA", None),
            Err(PasswordError::OneWay(_))
        ));
    }

    #[test]
    fn test_invalid_xor_body() {
        assert!(matches!(
            decode_password("{xor}not base64!", None),
            Err(PasswordError::InvalidBase64("xor", _))
        ));
    }
}
