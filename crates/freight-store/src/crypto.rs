//! Credential encryption.
//!
//! The cipher is an injectable collaborator so the store itself never
//! handles key material, and tests can substitute a capturing fake to
//! prove no plaintext reaches a write. Envelopes are self-describing:
//! `enc:v1:<key-id>:<nonce>:<ciphertext>` with URL-safe base64 fields.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chacha20poly1305::aead::{Aead, AeadCore, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use thiserror::Error;

/// Envelope marker; anything starting with this is treated as ciphertext.
const ENVELOPE_PREFIX: &str = "enc:v1:";

/// Errors from credential encryption and decryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error("credential envelope is malformed")]
    MalformedEnvelope,
    #[error("credential is encrypted under unknown key id '{0}'")]
    UnknownKeyId(String),
}

/// Encrypts and decrypts credential tokens.
pub trait CredentialCipher: Send + Sync {
    /// Wraps a plaintext token into an envelope.
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;
    /// Unwraps an envelope back to plaintext.
    fn decrypt(&self, envelope: &str) -> Result<String, CryptoError>;
}

/// True when `value` carries the envelope marker.
pub fn is_envelope(value: &str) -> bool {
    value.starts_with(ENVELOPE_PREFIX)
}

/// ChaCha20-Poly1305 cipher with a process-wide 32-byte key.
pub struct ChaChaCredentialCipher {
    key_id: String,
    cipher: ChaCha20Poly1305,
}

impl ChaChaCredentialCipher {
    /// Builds a cipher from raw key material. The key id travels inside
    /// every envelope so a rotated key is detected instead of producing
    /// garbage plaintext.
    pub fn new(key: &[u8; 32], key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            cipher: ChaCha20Poly1305::new(key.into()),
        }
    }
}

impl CredentialCipher for ChaChaCredentialCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;
        Ok(format!(
            "{ENVELOPE_PREFIX}{}:{}:{}",
            self.key_id,
            URL_SAFE_NO_PAD.encode(nonce),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }

    fn decrypt(&self, envelope: &str) -> Result<String, CryptoError> {
        let rest = envelope
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or(CryptoError::MalformedEnvelope)?;
        let mut parts = rest.split(':');
        let key_id = parts.next().ok_or(CryptoError::MalformedEnvelope)?;
        let nonce_b64 = parts.next().ok_or(CryptoError::MalformedEnvelope)?;
        let ciphertext_b64 = parts.next().ok_or(CryptoError::MalformedEnvelope)?;
        if parts.next().is_some() {
            return Err(CryptoError::MalformedEnvelope);
        }
        if key_id != self.key_id {
            return Err(CryptoError::UnknownKeyId(key_id.to_string()));
        }

        let nonce_raw = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|_| CryptoError::MalformedEnvelope)?;
        if nonce_raw.len() != 12 {
            return Err(CryptoError::MalformedEnvelope);
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ciphertext_b64)
            .map_err(|_| CryptoError::MalformedEnvelope)?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_raw), ciphertext.as_slice())
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> ChaChaCredentialCipher {
        ChaChaCredentialCipher::new(&[7u8; 32], "test-key")
    }

    #[test]
    fn round_trip() {
        let cipher = cipher();
        let envelope = cipher.encrypt("super-secret-token").expect("encrypt");
        assert!(is_envelope(&envelope));
        assert!(!envelope.contains("super-secret-token"));
        assert_eq!(cipher.decrypt(&envelope).expect("decrypt"), "super-secret-token");
    }

    #[test]
    fn distinct_nonces_per_encryption() {
        let cipher = cipher();
        let a = cipher.encrypt("token").expect("encrypt");
        let b = cipher.encrypt("token").expect("encrypt");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let envelope = cipher().encrypt("token").expect("encrypt");
        let other = ChaChaCredentialCipher::new(&[8u8; 32], "test-key");
        assert_eq!(other.decrypt(&envelope), Err(CryptoError::Decrypt));
    }

    #[test]
    fn unknown_key_id_is_reported() {
        let envelope = cipher().encrypt("token").expect("encrypt");
        let rotated = ChaChaCredentialCipher::new(&[7u8; 32], "newer-key");
        assert!(matches!(
            rotated.decrypt(&envelope),
            Err(CryptoError::UnknownKeyId(id)) if id == "test-key"
        ));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = cipher();
        let envelope = cipher.encrypt("token").expect("encrypt");
        let mut tampered = envelope.clone();
        let last = tampered.pop().expect("non-empty envelope");
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert!(cipher.decrypt(&tampered).is_err());
    }
}
