//! SQLite-backed record store with soft-delete scoping.
//!
//! One uniform set of verbs (find/create/update/destroy/undestroy/
//! delete) over every [`Record`] type. Reads against types that declare
//! the soft-delete capability implicitly exclude rows with
//! `is_destroyed = 1` unless the caller constrains that column itself or
//! asks for an unscoped query. `destroy` soft-deletes where the type
//! supports it and falls back to a hard delete where it does not, so
//! every type gets the same verb.
//!
//! ## Storage
//! A single `rusqlite` connection behind a mutex, WAL journal mode.
//! Every mutating verb commits before returning; there is no batched or
//! deferred write path. Cross-process consistency is the database's
//! job — `find_or_create` relies on the unique indexes (user `email`,
//! `uid`) to resolve concurrent duplicate creation, surfacing the loser
//! as [`StoreError::Conflict`].

pub mod filter;
pub mod record;

pub use filter::{Filter, SqlValue};
pub use record::Record;

use crate::error::StoreError;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// Soft-delete flag column shared by all capable tables.
const IS_DESTROYED: &str = "is_destroyed";

/// Handle to the persisted record collections.
///
/// Construct one at process startup and pass it to whatever needs data
/// access; it holds no global state.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uid TEXT NOT NULL UNIQUE,
                email TEXT UNIQUE,
                name TEXT NOT NULL,
                hashed_pw TEXT NOT NULL,
                is_destroyed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                secret TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);",
        )
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Find the first record matching the filter, or `None`.
    ///
    /// Soft-delete-capable types are implicitly filtered to
    /// `is_destroyed = false` unless the filter constrains that column.
    pub fn find_one<T: Record>(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        let conn = self.conn.lock();
        fetch_first::<T>(&conn, filter, false)
    }

    /// Find the first match, seeing destroyed rows too.
    pub fn find_one_unscoped<T: Record>(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        let conn = self.conn.lock();
        fetch_first::<T>(&conn, filter, true)
    }

    /// Find all records matching the filter, store-determined order.
    pub fn find_all<T: Record>(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let conn = self.conn.lock();
        fetch_all::<T>(&conn, filter, false)
    }

    /// Find all matches, seeing destroyed rows too.
    pub fn find_all_unscoped<T: Record>(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let conn = self.conn.lock();
        fetch_all::<T>(&conn, filter, true)
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Persist a new record and return it as stored.
    ///
    /// A unique-constraint rejection surfaces as [`StoreError::Conflict`].
    pub fn create<T: Record>(&self, draft: &T::Draft) -> Result<T, StoreError> {
        let conn = self.conn.lock();
        insert::<T>(&conn, draft)
    }

    /// Apply the patch's set fields to an existing record, persist, and
    /// return the updated record. An empty patch changes nothing.
    pub fn update<T: Record>(&self, record: &T, patch: &T::Patch) -> Result<T, StoreError> {
        let conn = self.conn.lock();
        apply_patch::<T>(&conn, record.id(), patch)
    }

    /// Find a record matching the filter; create it from the draft when
    /// absent, apply the patch as an update when present.
    ///
    /// Returns the record and whether it was newly created. The draft
    /// must itself satisfy the filter — callers keep the two consistent.
    /// NOT atomic across concurrent callers: the loser of a duplicate
    /// create race gets [`StoreError::Conflict`] from the table's unique
    /// index rather than a silent second row.
    pub fn find_or_create<T: Record>(
        &self,
        filter: &Filter,
        draft: &T::Draft,
        patch: &T::Patch,
    ) -> Result<(T, bool), StoreError> {
        let conn = self.conn.lock();
        match fetch_first::<T>(&conn, filter, false)? {
            Some(existing) => {
                let updated = apply_patch::<T>(&conn, existing.id(), patch)?;
                Ok((updated, false))
            }
            None => Ok((insert::<T>(&conn, draft)?, true)),
        }
    }

    /// Destroy the first record matching the filter.
    ///
    /// Soft-delete-capable types are flagged `is_destroyed = true`;
    /// other types are hard-deleted so every type answers to the same
    /// verb. Returns whether a record was found and destroyed. The
    /// lookup is scoped, so destroying an already-destroyed record
    /// returns `false`.
    pub fn destroy<T: Record>(&self, filter: &Filter) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        if !T::SOFT_DELETE {
            return hard_delete_first::<T>(&conn, filter);
        }
        match fetch_first::<T>(&conn, filter, false)? {
            Some(record) => {
                set_destroyed::<T>(&conn, record.id(), true)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Destroy a record instance directly.
    ///
    /// Unlike [`Store::destroy`] this is keyed on the record's id and
    /// skips the scoped lookup, so re-destroying an already-destroyed
    /// record still reports `true` as long as the row exists.
    pub fn destroy_record<T: Record>(&self, record: &T) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        if T::SOFT_DELETE {
            Ok(set_destroyed::<T>(&conn, record.id(), true)? > 0)
        } else {
            let affected = conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", T::TABLE),
                rusqlite::params![record.id()],
            )?;
            Ok(affected > 0)
        }
    }

    /// Clear the destroyed flag on the first record matching the filter.
    ///
    /// Errors with [`StoreError::SoftDeleteUnsupported`] for types
    /// without the capability. The lookup is unscoped — the destroyed
    /// row has to be visible to be restored.
    pub fn undestroy<T: Record>(&self, filter: &Filter) -> Result<bool, StoreError> {
        if !T::SOFT_DELETE {
            return Err(StoreError::SoftDeleteUnsupported { table: T::TABLE });
        }
        let conn = self.conn.lock();
        match fetch_first::<T>(&conn, filter, true)? {
            Some(record) => {
                set_destroyed::<T>(&conn, record.id(), false)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Hard-delete the first record matching the filter, bypassing any
    /// soft-delete capability (the lookup is unscoped). Returns whether
    /// a record was found and removed.
    pub fn delete<T: Record>(&self, filter: &Filter) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        hard_delete_first::<T>(&conn, filter)
    }
}

// ── Internals ───────────────────────────────────────────────────────

/// Whether a read should inject the `is_destroyed = false` condition.
fn scoped<T: Record>(filter: &Filter, unscoped: bool) -> bool {
    T::SOFT_DELETE && !unscoped && !filter.constrains(IS_DESTROYED)
}

fn fetch_first<T: Record>(
    conn: &Connection,
    filter: &Filter,
    unscoped: bool,
) -> Result<Option<T>, StoreError> {
    let (where_sql, binds) = filter.where_clause(scoped::<T>(filter, unscoped));
    let sql = format!(
        "SELECT {} FROM {}{} LIMIT 1",
        T::SELECT_COLUMNS,
        T::TABLE,
        where_sql
    );
    let params: Vec<&dyn rusqlite::types::ToSql> =
        binds.iter().map(|b| b as &dyn rusqlite::types::ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params.as_slice(), |row| T::from_row(row))?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

fn fetch_all<T: Record>(
    conn: &Connection,
    filter: &Filter,
    unscoped: bool,
) -> Result<Vec<T>, StoreError> {
    let (where_sql, binds) = filter.where_clause(scoped::<T>(filter, unscoped));
    let sql = format!(
        "SELECT {} FROM {}{}",
        T::SELECT_COLUMNS,
        T::TABLE,
        where_sql
    );
    let params: Vec<&dyn rusqlite::types::ToSql> =
        binds.iter().map(|b| b as &dyn rusqlite::types::ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params.as_slice(), |row| T::from_row(row))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Re-select a row by primary key, ignoring scoping.
fn fetch_by_id<T: Record>(conn: &Connection, id: i64) -> Result<T, StoreError> {
    fetch_first::<T>(conn, &Filter::by_id(id), true)?
        .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

fn insert<T: Record>(conn: &Connection, draft: &T::Draft) -> Result<T, StoreError> {
    let columns = T::draft_columns(draft);
    let names: Vec<&str> = columns.iter().map(|(c, _)| *c).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        names.join(", "),
        placeholders.join(", ")
    );
    let params: Vec<&dyn rusqlite::types::ToSql> = columns
        .iter()
        .map(|(_, v)| v as &dyn rusqlite::types::ToSql)
        .collect();

    match conn.execute(&sql, params.as_slice()) {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Err(StoreError::Conflict {
                table: T::TABLE,
                detail: msg.unwrap_or_else(|| err.to_string()),
            });
        }
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    tracing::debug!(table = T::TABLE, id, "record created");
    fetch_by_id::<T>(conn, id)
}

fn apply_patch<T: Record>(
    conn: &Connection,
    id: i64,
    patch: &T::Patch,
) -> Result<T, StoreError> {
    let columns = T::patch_columns(patch);
    if columns.is_empty() {
        return fetch_by_id::<T>(conn, id);
    }

    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (c, _))| format!("{c} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        T::TABLE,
        assignments.join(", "),
        columns.len() + 1
    );

    let id_value = SqlValue::Integer(id);
    let mut params: Vec<&dyn rusqlite::types::ToSql> = columns
        .iter()
        .map(|(_, v)| v as &dyn rusqlite::types::ToSql)
        .collect();
    params.push(&id_value);

    conn.execute(&sql, params.as_slice())?;
    tracing::debug!(table = T::TABLE, id, fields = columns.len(), "record updated");
    fetch_by_id::<T>(conn, id)
}

fn set_destroyed<T: Record>(
    conn: &Connection,
    id: i64,
    destroyed: bool,
) -> Result<usize, StoreError> {
    let affected = conn.execute(
        &format!("UPDATE {} SET is_destroyed = ?1 WHERE id = ?2", T::TABLE),
        rusqlite::params![destroyed, id],
    )?;
    tracing::debug!(table = T::TABLE, id, destroyed, "soft-delete flag set");
    Ok(affected)
}

fn hard_delete_first<T: Record>(conn: &Connection, filter: &Filter) -> Result<bool, StoreError> {
    match fetch_first::<T>(conn, filter, true)? {
        Some(record) => {
            conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", T::TABLE),
                rusqlite::params![record.id()],
            )?;
            tracing::debug!(table = T::TABLE, id = record.id(), "record deleted");
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewSession, NewUser, Session, SessionPatch, User, UserPatch};

    fn test_store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn draft(email: &str, name: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: name.to_string(),
            hashed_pw: "not-a-real-hash".to_string(),
        }
    }

    #[test]
    fn create_assigns_id_and_round_trips() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();

        assert!(user.id > 0);
        assert!(!user.uid.is_empty());
        assert!(!user.is_destroyed);

        let found: Option<User> = store.find_one(&Filter::new().eq("email", "a@x.com")).unwrap();
        assert_eq!(found.unwrap().id, user.id);
    }

    #[test]
    fn duplicate_email_surfaces_conflict() {
        let store = test_store();
        store.create::<User>(&draft("a@x.com", "A")).unwrap();

        let result = store.create::<User>(&draft("a@x.com", "B"));
        assert!(matches!(result, Err(StoreError::Conflict { table: "users", .. })));
    }

    #[test]
    fn destroyed_records_are_scoped_out() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();

        assert!(store.destroy::<User>(&Filter::by_id(user.id)).unwrap());

        let scoped: Option<User> = store.find_one(&Filter::by_id(user.id)).unwrap();
        assert!(scoped.is_none());

        let unscoped: Option<User> = store.find_one_unscoped(&Filter::by_id(user.id)).unwrap();
        assert!(unscoped.unwrap().is_destroyed);
    }

    #[test]
    fn explicit_is_destroyed_filter_overrides_scoping() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();
        store.destroy::<User>(&Filter::by_id(user.id)).unwrap();

        let found: Option<User> = store
            .find_one(&Filter::by_id(user.id).eq("is_destroyed", true))
            .unwrap();
        assert_eq!(found.unwrap().id, user.id);
    }

    #[test]
    fn destroy_twice_reports_false_second_time() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();

        assert!(store.destroy::<User>(&Filter::by_id(user.id)).unwrap());
        // Already scoped out, so the second destroy finds nothing.
        assert!(!store.destroy::<User>(&Filter::by_id(user.id)).unwrap());
    }

    #[test]
    fn destroy_record_is_keyed_on_id() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();

        assert!(store.destroy_record(&user).unwrap());
        // Row still exists, so the instance-keyed verb still touches it.
        assert!(store.destroy_record(&user).unwrap());

        let unscoped: Option<User> = store.find_one_unscoped(&Filter::by_id(user.id)).unwrap();
        assert!(unscoped.unwrap().is_destroyed);
    }

    #[test]
    fn destroy_without_capability_hard_deletes() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();
        let session: Session = store.create(&NewSession::for_user(user.id)).unwrap();

        assert!(store.destroy::<Session>(&Filter::by_id(session.id)).unwrap());

        let scoped: Option<Session> = store.find_one(&Filter::by_id(session.id)).unwrap();
        let unscoped: Option<Session> =
            store.find_one_unscoped(&Filter::by_id(session.id)).unwrap();
        assert!(scoped.is_none());
        assert!(unscoped.is_none());
    }

    #[test]
    fn undestroy_restores_the_record() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();
        store.destroy::<User>(&Filter::by_id(user.id)).unwrap();

        assert!(store.undestroy::<User>(&Filter::by_id(user.id)).unwrap());

        let found: Option<User> = store.find_one(&Filter::by_id(user.id)).unwrap();
        assert!(!found.unwrap().is_destroyed);
    }

    #[test]
    fn undestroy_without_capability_is_an_error() {
        let store = test_store();
        let result = store.undestroy::<Session>(&Filter::by_id(1));
        assert!(matches!(
            result,
            Err(StoreError::SoftDeleteUnsupported { table: "sessions" })
        ));
    }

    #[test]
    fn undestroy_missing_record_reports_false() {
        let store = test_store();
        assert!(!store.undestroy::<User>(&Filter::by_id(999)).unwrap());
    }

    #[test]
    fn delete_bypasses_soft_delete() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();
        store.destroy::<User>(&Filter::by_id(user.id)).unwrap();

        // Hard delete reaches the destroyed row.
        assert!(store.delete::<User>(&Filter::by_id(user.id)).unwrap());

        let unscoped: Option<User> = store.find_one_unscoped(&Filter::by_id(user.id)).unwrap();
        assert!(unscoped.is_none());
    }

    #[test]
    fn update_persists_field_changes() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();

        let updated = store
            .update(
                &user,
                &UserPatch {
                    name: Some("Renamed".to_string()),
                    ..UserPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, user.email);

        let found: Option<User> = store.find_one(&Filter::by_id(user.id)).unwrap();
        assert_eq!(found.unwrap().name, "Renamed");
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();

        let updated = store.update(&user, &UserPatch::default()).unwrap();
        assert_eq!(updated.name, user.name);
        assert_eq!(updated.email, user.email);
    }

    #[test]
    fn find_or_create_creates_when_absent() {
        let store = test_store();
        let (user, is_new): (User, bool) = store
            .find_or_create(
                &Filter::new().eq("email", "a@x.com"),
                &draft("a@x.com", "A"),
                &UserPatch::default(),
            )
            .unwrap();
        assert!(is_new);
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn find_or_create_updates_when_present() {
        let store = test_store();
        let first: User = store.create(&draft("a@x.com", "A")).unwrap();

        let (user, is_new): (User, bool) = store
            .find_or_create(
                &Filter::new().eq("email", "a@x.com"),
                &draft("a@x.com", "Other"),
                &UserPatch {
                    name: Some("Patched".to_string()),
                    ..UserPatch::default()
                },
            )
            .unwrap();
        assert!(!is_new);
        assert_eq!(user.id, first.id);
        assert_eq!(user.name, "Patched");
    }

    #[test]
    fn find_all_with_membership_filter() {
        let store = test_store();
        let a: User = store.create(&draft("a@x.com", "A")).unwrap();
        let b: User = store.create(&draft("b@x.com", "B")).unwrap();
        let _c: User = store.create(&draft("c@x.com", "C")).unwrap();

        let found: Vec<User> = store
            .find_all(&Filter::new().one_of("id", [a.id, b.id]))
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn find_all_with_empty_membership_matches_nothing() {
        let store = test_store();
        store.create::<User>(&draft("a@x.com", "A")).unwrap();

        let found: Vec<User> = store
            .find_all(&Filter::new().one_of("id", Vec::<i64>::new()))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn find_all_scoping_excludes_destroyed_rows() {
        let store = test_store();
        let a: User = store.create(&draft("a@x.com", "A")).unwrap();
        let _b: User = store.create(&draft("b@x.com", "B")).unwrap();
        store.destroy::<User>(&Filter::by_id(a.id)).unwrap();

        let scoped: Vec<User> = store.find_all(&Filter::new()).unwrap();
        assert_eq!(scoped.len(), 1);

        let unscoped: Vec<User> = store.find_all_unscoped(&Filter::new()).unwrap();
        assert_eq!(unscoped.len(), 2);
    }

    #[test]
    fn combined_eq_and_membership_conditions_and_together() {
        let store = test_store();
        let a: User = store.create(&draft("a@x.com", "Shared")).unwrap();
        let b: User = store.create(&draft("b@x.com", "Shared")).unwrap();
        store.create::<User>(&draft("c@x.com", "Other")).unwrap();

        let found: Vec<User> = store
            .find_all(
                &Filter::new()
                    .eq("name", "Shared")
                    .one_of("id", [a.id, b.id]),
            )
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn session_patch_updates_secret() {
        let store = test_store();
        let user: User = store.create(&draft("a@x.com", "A")).unwrap();
        let session: Session = store.create(&NewSession::for_user(user.id)).unwrap();

        let updated = store
            .update(
                &session,
                &SessionPatch {
                    secret: Some("rotated".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.secret, "rotated");
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("burrow.db");

        let user_id = {
            let store = Store::open(&db_path).unwrap();
            let user: User = store.create(&draft("a@x.com", "A")).unwrap();
            user.id
        };

        let store = Store::open(&db_path).unwrap();
        let found: Option<User> = store.find_one(&Filter::by_id(user_id)).unwrap();
        assert!(found.is_some());
    }
}
