//! Current-user resolution from a raw request-header value.

use crate::auth::codec;
use crate::error::StoreError;
use crate::models::{Session, User};
use crate::store::{Filter, Store};

/// Resolve the authenticated user behind a raw auth-header value.
///
/// The header value is URL-decoded, parsed as a session token, and the
/// session looked up by id alone; the stored secret is then compared
/// against the token's secret in constant time — an id-only match is
/// not authentication. The final user lookup is scoped, so a destroyed
/// user never resolves.
///
/// Every failure along the way (missing header, undecodable or
/// malformed token, unknown session, secret mismatch, destroyed user)
/// yields `Ok(None)` — never a partial identity, never a panic on
/// attacker-controlled input. Only storage failures are errors.
pub fn current_user(
    store: &Store,
    raw_header: Option<&str>,
) -> Result<Option<User>, StoreError> {
    let Some(raw) = raw_header else {
        return Ok(None);
    };
    let Ok(decoded) = urlencoding::decode(raw) else {
        return Ok(None);
    };
    let Ok((session_id, secret)) = codec::deserialize_token(&decoded) else {
        return Ok(None);
    };

    let Some(session) = store.find_one::<Session>(&Filter::by_id(session_id))? else {
        return Ok(None);
    };
    if !codec::constant_time_eq(&session.secret, &secret) {
        tracing::debug!(session_id, "session secret mismatch");
        return Ok(None);
    }

    store.find_one::<User>(&Filter::by_id(session.user_id))
}
