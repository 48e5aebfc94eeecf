//! Burrow — a SQLite-backed record store with soft-delete scoping and
//! token-based session authentication.
//!
//! Two independent pieces, composed by callers:
//! - [`store`]: uniform create/find/update/destroy/undestroy/delete
//!   verbs over any [`store::Record`] type, with reads implicitly
//!   excluding soft-deleted rows.
//! - [`auth`]: password hashing, random session secrets, and the
//!   `<session_id>%<secret>` bearer-token codec, plus the signup/login
//!   and current-user flows built on both pieces.
//!
//! ```
//! use burrow::auth::{current_user, sign_up, SignupOutcome};
//! use burrow::store::Store;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open_in_memory()?;
//!
//! let SignupOutcome::Created(grant) = sign_up(&store, "a@x.com", "A", "hunter2")? else {
//!     unreachable!("email is free");
//! };
//!
//! // Later, a request arrives carrying the token in a header.
//! let user = current_user(&store, Some(&grant.token))?;
//! assert_eq!(user.unwrap().id, grant.user.id);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::{Config, RuntimeEnv};
pub use error::{AuthError, ConfigError, StoreError};
pub use models::{NewSession, NewUser, Session, SessionPatch, User, UserPatch};
pub use store::{Filter, Record, SqlValue, Store};
