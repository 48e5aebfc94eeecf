//! Query filters: exact-match and set-membership conditions, ANDed.
//!
//! A [`Filter`] is the only query language the store speaks — no joins,
//! no ranges, no pagination. Conditions are assembled into a WHERE
//! clause with numbered placeholders and a parallel bind list, the same
//! way the telemetry-style stores build their search queries.

use rusqlite::types::{Null, ToSql, ToSqlOutput};

/// A value bindable into a SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
    Bool(bool),
    Null,
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Integer(v) => v.to_sql(),
            Self::Text(v) => v.to_sql(),
            Self::Bool(v) => v.to_sql(),
            Self::Null => Null.to_sql(),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A single column condition.
#[derive(Debug, Clone)]
enum Condition {
    /// `column = value`
    Eq(SqlValue),
    /// `column IN (values...)`; an empty list matches nothing.
    OneOf(Vec<SqlValue>),
}

/// An AND-combined set of column conditions.
///
/// Column names are `&'static str` — they come from call sites, never
/// from user input.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(&'static str, Condition)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the common primary-key lookup.
    pub fn by_id(id: i64) -> Self {
        Self::new().eq("id", id)
    }

    /// Add an exact-match condition.
    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.conditions.push((column, Condition::Eq(value.into())));
        self
    }

    /// Add a set-membership condition (`IN`). An empty set matches no rows.
    #[must_use]
    pub fn one_of<V: Into<SqlValue>>(
        mut self,
        column: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push((column, Condition::OneOf(values)));
        self
    }

    /// Whether any condition already constrains the given column.
    /// Used by the store to decide if soft-delete scoping applies.
    pub(crate) fn constrains(&self, column: &str) -> bool {
        self.conditions.iter().any(|(c, _)| *c == column)
    }

    /// Render `WHERE ...` SQL plus its bind values. `scope_soft_delete`
    /// appends the implicit `is_destroyed = false` condition.
    pub(crate) fn where_clause(&self, scope_soft_delete: bool) -> (String, Vec<SqlValue>) {
        let mut sql = String::from(" WHERE 1=1");
        let mut binds: Vec<SqlValue> = Vec::new();
        let mut param_idx = 1;

        for (column, condition) in &self.conditions {
            match condition {
                Condition::Eq(value) => {
                    sql.push_str(&format!(" AND {column} = ?{param_idx}"));
                    binds.push(value.clone());
                    param_idx += 1;
                }
                Condition::OneOf(values) if values.is_empty() => {
                    // Membership in the empty set: matches nothing,
                    // but must stay valid SQL.
                    sql.push_str(" AND 1=0");
                }
                Condition::OneOf(values) => {
                    let placeholders: Vec<String> = (0..values.len())
                        .map(|i| format!("?{}", param_idx + i))
                        .collect();
                    sql.push_str(&format!(" AND {column} IN ({})", placeholders.join(", ")));
                    binds.extend(values.iter().cloned());
                    param_idx += values.len();
                }
            }
        }

        if scope_soft_delete {
            sql.push_str(&format!(" AND is_destroyed = ?{param_idx}"));
            binds.push(SqlValue::Bool(false));
        }

        (sql, binds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_and_membership_combine_with_and() {
        let filter = Filter::new()
            .eq("email", "a@x.com")
            .one_of("id", [1i64, 2, 3]);
        let (sql, binds) = filter.where_clause(false);
        assert_eq!(sql, " WHERE 1=1 AND email = ?1 AND id IN (?2, ?3, ?4)");
        assert_eq!(binds.len(), 4);
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let filter = Filter::new().one_of("id", Vec::<i64>::new());
        let (sql, binds) = filter.where_clause(false);
        assert_eq!(sql, " WHERE 1=1 AND 1=0");
        assert!(binds.is_empty());
    }

    #[test]
    fn scoping_appends_is_destroyed_condition() {
        let (sql, binds) = Filter::by_id(7).where_clause(true);
        assert_eq!(sql, " WHERE 1=1 AND id = ?1 AND is_destroyed = ?2");
        assert_eq!(binds[1], SqlValue::Bool(false));
    }

    #[test]
    fn constrains_detects_explicit_column() {
        let filter = Filter::new().eq("is_destroyed", true);
        assert!(filter.constrains("is_destroyed"));
        assert!(!filter.constrains("email"));
    }

    #[test]
    fn option_binds_null() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(3i64)), SqlValue::Integer(3));
    }
}
