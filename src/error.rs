//! Public error types for the crate.
//!
//! "Not found" and "authentication failed" are ordinary return values
//! (`Option`, `bool`, outcome enums) — only storage rejections, malformed
//! tokens handed to the codec directly, and misuse of the soft-delete
//! verbs surface as errors.

use thiserror::Error;

/// Errors raised by [`crate::store::Store`] operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The storage layer rejected a write because of a unique constraint
    /// (e.g. a duplicate user email). Kept distinct from other database
    /// failures so callers can resolve create races.
    #[error("write to `{table}` rejected by unique constraint: {detail}")]
    Conflict {
        table: &'static str,
        detail: String,
    },

    /// `undestroy` was invoked on a record type without an
    /// `is_destroyed` column.
    #[error("`{table}` has no is_destroyed column and cannot be undestroyed")]
    SoftDeleteUnsupported { table: &'static str },

    /// Any other database failure (connectivity, I/O, malformed rows).
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors raised by the credential/session codec and the account flows.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A session token could not be parsed: missing `%` delimiter or a
    /// non-integer session id prefix. During current-user resolution
    /// this degrades to "no authenticated user" instead of surfacing.
    #[error("malformed session token")]
    MalformedToken,

    /// The bcrypt engine rejected a hashing request. Unreachable at the
    /// fixed work factor, but typed rather than panicking.
    #[error("password hashing failed: {0}")]
    Hash(#[source] bcrypt::BcryptError),

    /// A storage failure encountered while resolving or issuing
    /// credentials.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while loading [`crate::config::Config`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown runtime environment `{0}` (expected dev, test, staging, or prod)")]
    UnknownEnv(String),
}
