//! Cryptographic Utilities
//!
//! Random bytes, SHA-256, Base64 and HMAC-signed opaque tokens.

use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode bytes as base64
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// Compute HMAC-SHA256
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Signs and verifies `<payload>.<mac>` tokens.
///
/// The MAC is HMAC-SHA256 over the payload, encoded as unpadded base64url.
/// The payload must not contain `.`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TokenSigner {
    key: [u8; 32],
}

impl TokenSigner {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Keys that are not exactly 32 bytes are condensed with SHA-256.
    pub fn from_secret(secret: &[u8]) -> Self {
        match <[u8; 32]>::try_from(secret) {
            Ok(key) => Self::new(key),
            Err(_) => Self::new(sha256(secret)),
        }
    }

    pub fn sign(&self, payload: &str) -> String {
        let mac = hmac_sha256(&self.key, payload.as_bytes());
        format!("{}.{}", payload, general_purpose::URL_SAFE_NO_PAD.encode(mac))
    }

    /// Returns the payload if the signature matches.
    pub fn verify<'a>(&self, token: &'a str) -> Option<&'a str> {
        let (payload, signature) = token.rsplit_once('.')?;
        let provided = general_purpose::URL_SAFE_NO_PAD.decode(signature).ok()?;
        let expected = hmac_sha256(&self.key, payload.as_bytes());
        constant_time_eq(&provided, &expected).then_some(payload)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").field("key", &"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_values() {
        let hash = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn test_hmac_rfc4231_case_2() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        let expected =
            hex::decode("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
                .unwrap();
        assert_eq!(mac.to_vec(), expected);
    }

    #[test]
    fn test_random_bytes() {
        let bytes = random_bytes(32);
        assert_eq!(bytes.len(), 32);
        assert!(bytes.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2]));
    }

    #[test]
    fn test_signed_token_verifies() {
        let signer = TokenSigner::new([7u8; 32]);
        let token = signer.sign("4f2c1e7a-session");
        assert_eq!(signer.verify(&token), Some("4f2c1e7a-session"));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let signer = TokenSigner::new([7u8; 32]);
        let token = signer.sign("abc");
        let forged = token.replacen("abc", "abd", 1);
        assert_eq!(signer.verify(&forged), None);
        assert_eq!(signer.verify("abc"), None);
        assert_eq!(signer.verify("abc.!!!"), None);
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let token = TokenSigner::new([1u8; 32]).sign("abc");
        assert_eq!(TokenSigner::from_secret(b"another secret").verify(&token), None);
    }

    #[test]
    fn test_debug_redaction() {
        let debug_output = format!("{:?}", TokenSigner::new([9u8; 32]));
        assert!(debug_output.contains("REDACTED"));
    }
}
