//! Password hashing and session-token serialization.

use crate::error::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha512};

/// Secret byte length before base64 encoding (32 bytes = 43 chars).
const SECRET_BYTES: usize = 32;

/// bcrypt work factor: moderate cost suitable for interactive login.
const BCRYPT_COST: u32 = 10;

/// Separates the decimal session id from the secret in a token. The
/// secret encoding must never produce this character.
const TOKEN_DELIMITER: char = '%';

/// Hex-encoded SHA-512 digest, normalizing arbitrarily long input to a
/// fixed length before the bcrypt stage.
fn prehash(plaintext: &str) -> String {
    hex::encode(Sha512::digest(plaintext.as_bytes()))
}

/// Hash a password for storage.
///
/// The returned string is bcrypt's self-describing format (algorithm
/// identifier, work factor, salt, and digest), so verification needs
/// nothing stored separately.
pub fn hash_password(plaintext: &str) -> Result<String, AuthError> {
    bcrypt::hash(prehash(plaintext), BCRYPT_COST).map_err(AuthError::Hash)
}

/// Verify a candidate password against a stored hash.
///
/// A malformed or garbage `stored_hash` is a verification failure, not
/// an error — this never panics or returns `Err` on bad input.
pub fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    bcrypt::verify(prehash(candidate), stored_hash).unwrap_or(false)
}

/// Generate a session secret: 32 bytes of cryptographically secure
/// randomness, URL-safe base64 without padding. The encoding alphabet
/// contains no `%`, so a secret can never collide with the token
/// delimiter.
pub fn fresh_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Serialize a session token: `<session_id>%<secret>`.
pub fn serialize_token(session_id: i64, secret: &str) -> String {
    format!("{session_id}{TOKEN_DELIMITER}{secret}")
}

/// Parse a session token back into `(session_id, secret)`.
///
/// Splits on the first `%`; a stray `%` later in the string stays in
/// the secret (and will simply fail the secret match). Missing
/// delimiter or a non-integer id prefix is [`AuthError::MalformedToken`].
pub fn deserialize_token(token: &str) -> Result<(i64, String), AuthError> {
    let (id_part, secret) = token
        .split_once(TOKEN_DELIMITER)
        .ok_or(AuthError::MalformedToken)?;
    let session_id: i64 = id_part.parse().map_err(|_| AuthError::MalformedToken)?;
    Ok((session_id, secret.to_string()))
}
