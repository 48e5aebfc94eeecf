//! Credential hashing, session tokens, and the flows that compose them.
//!
//! Provides:
//! - Password hashing (SHA-512 pre-hash + bcrypt at a fixed interactive
//!   work factor) and verification that treats malformed stored hashes
//!   as ordinary failures
//! - Cryptographically random session secrets in a URL-safe,
//!   delimiter-free encoding
//! - Session token serialization (`<session_id>%<secret>`) and parsing
//! - Current-user resolution from a raw request-header value
//! - Signup and login account flows
//!
//! ## Design Decisions
//! - Session tokens are opaque `<id>%<secret>` pairs; the secret half is
//!   always checked with a constant-time compare, never matched in SQL.
//! - Authentication failures (unknown user, wrong password, bad token)
//!   are result values, never errors; only storage failures propagate.
//! - The SHA-512 pre-hash normalizes arbitrarily long passwords before
//!   bcrypt's input limit applies; bcrypt's modular-crypt output keeps
//!   algorithm, cost, and salt in the stored string.

pub mod accounts;
pub mod codec;
pub mod identity;

pub use accounts::{log_in, sign_up, AuthGrant, LoginOutcome, SignupOutcome};
pub use identity::current_user;
