//! Notification verifier trait - authenticity check for inbound webhooks.

/// Verifies a notification's authenticity token against a shared secret.
///
/// Implementations must compare in constant time and must not inspect the
/// payload beyond what the scheme needs (a body signature reads the raw
/// bytes, never parses them).
pub trait NotificationVerifier: Send + Sync {
    /// HTTP header carrying the token for this scheme.
    fn token_header(&self) -> &'static str;

    fn verify(&self, payload: &[u8], token: &str) -> bool;
}
