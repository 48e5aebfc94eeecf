//! Signup and login flows: verify or establish credentials, persist the
//! records, and issue a session token.
//!
//! Transport concerns (routes, payload validation, response rendering)
//! live with the caller; these functions take already-validated input
//! and return outcome enums — authentication failure is a value here,
//! not an error.

use crate::auth::codec;
use crate::error::AuthError;
use crate::models::{NewUser, Session, User};
use crate::store::{Filter, Store};

/// What a successful authentication yields: the user, their fresh
/// session, and the serialized bearer token for the response header.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub user: User,
    pub session: Session,
    pub token: String,
}

/// Result of a signup attempt.
#[derive(Debug)]
pub enum SignupOutcome {
    Created(AuthGrant),
    /// Another live account already owns this email (checked up front,
    /// and again via the unique constraint to cover create races).
    EmailTaken,
}

/// Result of a login attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(AuthGrant),
    UnknownEmail,
    WrongPassword,
}

/// Create a new user account and issue its first session.
pub fn sign_up(
    store: &Store,
    email: &str,
    name: &str,
    password: &str,
) -> Result<SignupOutcome, AuthError> {
    if store
        .find_one::<User>(&Filter::new().eq("email", email))?
        .is_some()
    {
        return Ok(SignupOutcome::EmailTaken);
    }

    let hashed_pw = codec::hash_password(password)?;
    let user: User = match store.create(&NewUser {
        email: email.to_string(),
        name: name.to_string(),
        hashed_pw,
    }) {
        Ok(user) => user,
        // Lost a concurrent signup race; the unique index on email is
        // the arbiter (the store itself takes no cross-process locks).
        Err(crate::error::StoreError::Conflict { .. }) => {
            return Ok(SignupOutcome::EmailTaken);
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, "user created");
    Ok(SignupOutcome::Created(issue_session(store, user)?))
}

/// Authenticate an existing user by email and password, issuing a fresh
/// session on success. A user may hold many concurrent sessions.
pub fn log_in(store: &Store, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
    let Some(user) = store.find_one::<User>(&Filter::new().eq("email", email))? else {
        // Burn a hash so unknown emails cost the same as wrong passwords.
        let _ = codec::hash_password(password);
        return Ok(LoginOutcome::UnknownEmail);
    };

    if !codec::verify_password(&user.hashed_pw, password) {
        return Ok(LoginOutcome::WrongPassword);
    }

    tracing::debug!(user_id = user.id, "login succeeded");
    Ok(LoginOutcome::Authenticated(issue_session(store, user)?))
}

fn issue_session(store: &Store, user: User) -> Result<AuthGrant, AuthError> {
    let session: Session = store.create(&user.new_session())?;
    let token = codec::serialize_token(session.id, &session.secret);
    Ok(AuthGrant {
        user,
        session,
        token,
    })
}
