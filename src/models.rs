//! Persisted record types.
//!
//! Tables:
//!
//!   User
//!   Session
//!
//! Relationships:
//!
//!   User --> has many --> Sessions
//!   Session --> belongs to --> User
//!
//! `User` declares the soft-delete capability; destroying a user flags
//! the row instead of removing it. `Session` does not, so destroying a
//! session removes it outright.

use crate::auth::codec;
use crate::store::{Record, SqlValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Primary key, assigned at creation.
    pub id: i64,
    /// Public identifier (UUIDv4, simple format), unique.
    pub uid: String,
    /// Unique email address.
    pub email: Option<String>,
    /// Display name.
    pub name: String,
    /// Opaque password hash, stored verbatim and never exposed.
    #[serde(skip_serializing, default)]
    pub hashed_pw: String,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_destroyed: bool,
    /// When this user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Draft a fresh session owned by this user, with a generated secret.
    pub fn new_session(&self) -> NewSession {
        NewSession::for_user(self.id)
    }
}

/// Insert payload for [`User`]. The `uid` and `created_at` columns are
/// generated at insert time.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub hashed_pw: String,
}

/// Partial update for [`User`]; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub hashed_pw: Option<String>,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const SELECT_COLUMNS: &'static str = "id, uid, email, name, hashed_pw, is_destroyed, created_at";
    const SOFT_DELETE: bool = true;

    type Draft = NewUser;
    type Patch = UserPatch;

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let raw_created_at: String = row.get(6)?;
        let created_at = DateTime::parse_from_rfc3339(&raw_created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
        Ok(Self {
            id: row.get(0)?,
            uid: row.get(1)?,
            email: row.get(2)?,
            name: row.get(3)?,
            hashed_pw: row.get(4)?,
            is_destroyed: row.get(5)?,
            created_at,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn draft_columns(draft: &NewUser) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("uid", Uuid::new_v4().simple().to_string().into()),
            ("email", draft.email.clone().into()),
            ("name", draft.name.clone().into()),
            ("hashed_pw", draft.hashed_pw.clone().into()),
            ("created_at", Utc::now().to_rfc3339().into()),
        ]
    }

    fn patch_columns(patch: &UserPatch) -> Vec<(&'static str, SqlValue)> {
        let mut columns = Vec::new();
        if let Some(email) = &patch.email {
            columns.push(("email", email.clone().into()));
        }
        if let Some(name) = &patch.name {
            columns.push(("name", name.clone().into()));
        }
        if let Some(hashed_pw) = &patch.hashed_pw {
            columns.push(("hashed_pw", hashed_pw.clone().into()));
        }
        columns
    }
}

/// An authenticated session owned by one user.
///
/// The `secret` is the bearer credential half of a session token; it is
/// compared in constant time during resolution, never in SQL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub secret: String,
}

/// Insert payload for [`Session`].
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub secret: String,
}

impl NewSession {
    /// Draft a session for a user with a freshly generated secret.
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id,
            secret: codec::fresh_secret(),
        }
    }
}

/// Partial update for [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub secret: Option<String>,
}

impl Record for Session {
    const TABLE: &'static str = "sessions";
    const SELECT_COLUMNS: &'static str = "id, user_id, secret";

    type Draft = NewSession;
    type Patch = SessionPatch;

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            secret: row.get(2)?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn draft_columns(draft: &NewSession) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("user_id", draft.user_id.into()),
            ("secret", draft.secret.clone().into()),
        ]
    }

    fn patch_columns(patch: &SessionPatch) -> Vec<(&'static str, SqlValue)> {
        let mut columns = Vec::new();
        if let Some(secret) = &patch.secret {
            columns.push(("secret", secret.clone().into()));
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Filter, Store};

    #[test]
    fn users_get_distinct_uids() {
        let store = Store::open_in_memory().unwrap();
        let a: User = store
            .create(&NewUser {
                email: "a@x.com".into(),
                name: "A".into(),
                hashed_pw: "h".into(),
            })
            .unwrap();
        let b: User = store
            .create(&NewUser {
                email: "b@x.com".into(),
                name: "B".into(),
                hashed_pw: "h".into(),
            })
            .unwrap();
        assert_ne!(a.uid, b.uid);
        assert_eq!(a.uid.len(), 32);
    }

    #[test]
    fn created_at_round_trips_through_storage() {
        let store = Store::open_in_memory().unwrap();
        let user: User = store
            .create(&NewUser {
                email: "a@x.com".into(),
                name: "A".into(),
                hashed_pw: "h".into(),
            })
            .unwrap();

        let found: User = store.find_one(&Filter::by_id(user.id)).unwrap().unwrap();
        assert_eq!(found.created_at, user.created_at);
    }

    #[test]
    fn session_draft_generates_a_secret() {
        let draft = NewSession::for_user(1);
        assert_eq!(draft.secret.len(), 43);
        assert!(!draft.secret.contains('%'));
    }

    #[test]
    fn serialized_user_omits_password_hash() {
        let user = User {
            id: 1,
            uid: "abc".into(),
            email: Some("a@x.com".into()),
            name: "A".into(),
            hashed_pw: "$2b$10$secret".into(),
            is_destroyed: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hashed_pw"));
        assert!(!json.contains("$2b$10$"));
    }
}
