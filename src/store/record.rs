//! The [`Record`] trait: what a type must provide to live in the store.

use crate::store::filter::SqlValue;

/// A persisted record type.
///
/// Implementations describe their table, how a row maps back into the
/// type, and how their insert/update payloads map to columns. Types
/// whose table carries an `is_destroyed` column opt into soft deletion
/// by overriding [`Record::SOFT_DELETE`]; store reads then implicitly
/// exclude destroyed rows unless the caller filters on `is_destroyed`
/// explicitly or asks for an unscoped query.
pub trait Record: Sized {
    /// Table name.
    const TABLE: &'static str;

    /// Column list selected by every read, in [`Record::from_row`] order.
    const SELECT_COLUMNS: &'static str;

    /// Whether the table carries an `is_destroyed` column.
    const SOFT_DELETE: bool = false;

    /// Insert payload accepted by [`crate::store::Store::create`].
    type Draft;

    /// Partial-update payload accepted by [`crate::store::Store::update`].
    type Patch;

    /// Map a selected row back into the record type.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;

    /// Primary-key identifier, assigned at creation, immutable.
    fn id(&self) -> i64;

    /// Column/value pairs inserted for a draft.
    fn draft_columns(draft: &Self::Draft) -> Vec<(&'static str, SqlValue)>;

    /// Column/value pairs assigned by a patch. Unset fields are absent.
    fn patch_columns(patch: &Self::Patch) -> Vec<(&'static str, SqlValue)>;
}
