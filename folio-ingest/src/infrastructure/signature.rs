//! Webhook authenticity checks.
//!
//! - [`HmacSha256Verifier`]: `X-Hub-Signature-256: sha256=<hex>` computed
//!   over the raw request body (GitHub, Gitea).
//! - [`SharedTokenVerifier`]: the secret itself sent in a header
//!   (GitLab's `X-Gitlab-Token` style).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::port::notification_verifier::NotificationVerifier;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const TOKEN_HEADER: &str = "x-webhook-token";
const SIGNATURE_PREFIX: &str = "sha256=";

pub struct HmacSha256;

impl HmacSha256 {
    /// HMAC-SHA256 of `data` under `key`.
    pub fn compute(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac = new_mac(key);
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    /// Constant-time check of `expected` against the HMAC of `data`.
    pub fn verify(key: &[u8], data: &[u8], expected: &[u8]) -> bool {
        let mut mac = new_mac(key);
        mac.update(data);
        mac.verify_slice(expected).is_ok()
    }

    /// Header value for `data`, as a sender would produce it.
    pub fn sign_header(key: &[u8], data: &[u8]) -> String {
        format!("{SIGNATURE_PREFIX}{}", hex::encode(Self::compute(key, data)))
    }
}

fn new_mac(key: &[u8]) -> Hmac<Sha256> {
    // HMAC is defined for keys of any length, so this cannot fail.
    match <Hmac<Sha256> as Mac>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    }
}

/// Byte comparison whose running time depends only on the lengths.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}

pub struct HmacSha256Verifier {
    secret: Vec<u8>,
}

impl HmacSha256Verifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }
}

impl NotificationVerifier for HmacSha256Verifier {
    fn token_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }

    fn verify(&self, payload: &[u8], token: &str) -> bool {
        let Some(hex_digest) = token.trim().strip_prefix(SIGNATURE_PREFIX) else {
            return false;
        };
        let Ok(expected) = hex::decode(hex_digest) else {
            return false;
        };
        HmacSha256::verify(&self.secret, payload, &expected)
    }
}

pub struct SharedTokenVerifier {
    secret: Vec<u8>,
}

impl SharedTokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }
}

impl NotificationVerifier for SharedTokenVerifier {
    fn token_header(&self) -> &'static str {
        TOKEN_HEADER
    }

    fn verify(&self, _payload: &[u8], token: &str) -> bool {
        constant_time_eq(token.as_bytes(), &self.secret)
    }
}
