//! Webhook signature verification
//!
//! Deliveries carry `X-Hub-Signature-256: sha256=<hex>`, the HMAC-SHA256 of
//! the raw request body keyed with the shared webhook secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,

    #[error("signature header malformed")]
    Malformed,

    #[error("signature does not match payload")]
    Mismatch,
}

/// Verifies delivery signatures against the shared secret
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Check `signature` (the raw header value, if any) against `payload`
    ///
    /// The digest comparison is constant-time.
    pub fn verify(&self, signature: Option<&str>, payload: &[u8]) -> Result<(), SignatureError> {
        let signature = signature.ok_or(SignatureError::Missing)?;
        let digest = signature
            .trim()
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or(SignatureError::Malformed)?;
        let expected = hex::decode(digest).map_err(|_| SignatureError::Malformed)?;

        self.mac(payload)
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Header value a sender holding the same secret would attach
    pub fn sign(&self, payload: &[u8]) -> String {
        let digest = self.mac(payload).finalize().into_bytes();
        format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest))
    }

    fn mac(&self, payload: &[u8]) -> HmacSha256 {
        // HMAC-SHA256 accepts keys of any length, so this never fails
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .expect("HMAC-SHA256 accepts any key length");
        mac.update(payload);
        mac
    }
}
