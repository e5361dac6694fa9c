use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of an anonymous session identifier in hex characters.
const ANONYMOUS_ID_LEN: usize = 32;

/// Generates a random anti-CSRF token.
///
/// Returns a 43-character URL-safe string (32 random bytes → base64url).
#[must_use]
pub fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generates a random anonymous session identifier.
///
/// Returns 32 lowercase hex characters (16 random bytes).
#[must_use]
pub fn generate_anonymous_id() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    hex::encode(random_bytes)
}

/// Whether `value` has the shape of an anonymous session identifier.
#[must_use]
pub fn is_anonymous_id(value: &str) -> bool {
    value.len() == ANONYMOUS_ID_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Derives the session lookup key for a credential.
///
/// `key = HEX(SHA256(credential))`
#[must_use]
pub fn derive_session_key(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

/// Compares two strings without short-circuiting on the first differing byte.
///
/// Length is not secret: tokens of a different length are rejected early.
#[must_use]
pub fn constant_time_eq(expected: &str, presented: &str) -> bool {
    if expected.len() != presented.len() {
        return false;
    }
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}
