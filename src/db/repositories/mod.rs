//! Database repositories
//!
//! One repository per entity. Each trait has a `Sqlx*Repository`
//! implementation that dispatches on the pool's driver to a SQLite or MySQL
//! variant of every query.

pub mod blog;
pub mod session;
pub mod task;
pub mod user;

pub use blog::{BlogRepository, SqlxBlogRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use task::{SqlxTaskRepository, TaskRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::mysql::{MySqlArguments, MySqlPool};
use sqlx::query::{Query, QueryScalar};
use sqlx::sqlite::{SqliteArguments, SqlitePool};
use sqlx::{MySql, Sqlite};

use super::DynDatabasePool;

/// Borrow the SQLite pool, failing if the driver says otherwise
pub(crate) fn sqlite_pool(pool: &DynDatabasePool) -> Result<&SqlitePool> {
    pool.as_sqlite()
        .ok_or_else(|| anyhow!("Database pool is not a SQLite pool"))
}

/// Borrow the MySQL pool, failing if the driver says otherwise
pub(crate) fn mysql_pool(pool: &DynDatabasePool) -> Result<&MySqlPool> {
    pool.as_mysql()
        .ok_or_else(|| anyhow!("Database pool is not a MySQL pool"))
}

/// Encode a nested document for a JSON text column
pub(crate) fn to_json_column<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("Failed to encode JSON column")
}

/// Decode a JSON text column, treating NULL or empty text as the default
pub(crate) fn from_json_column<T: DeserializeOwned + Default>(raw: Option<String>) -> Result<T> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(text) => serde_json::from_str(text).context("Failed to decode JSON column"),
    }
}

/// A value bound into a dynamically built WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
}

/// WHERE fragments joined with AND, plus their `?` bindings in order
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition with one `?` placeholder per value
    pub fn push(&mut self, condition: impl Into<String>, values: impl IntoIterator<Item = SqlValue>) {
        self.conditions.push(condition.into());
        self.values.extend(values);
    }

    /// ` WHERE a AND b`, or nothing when empty
    pub fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                SqlValue::Text(v) => query.bind(v.clone()),
                SqlValue::Int(v) => query.bind(*v),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::Time(v) => query.bind(*v),
            };
        }
        query
    }};
}

pub(crate) fn bind_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    bind_values!(query, values)
}

pub(crate) fn bind_sqlite_scalar<'q, O>(
    query: QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>,
    values: &[SqlValue],
) -> QueryScalar<'q, Sqlite, O, SqliteArguments<'q>> {
    bind_values!(query, values)
}

pub(crate) fn bind_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    values: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    bind_values!(query, values)
}

pub(crate) fn bind_mysql_scalar<'q, O>(
    query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    bind_values!(query, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_empty() {
        let clause = WhereClause::new();
        assert_eq!(clause.sql(), "");
        assert!(clause.values().is_empty());
    }

    #[test]
    fn test_where_clause_joins_conditions() {
        let mut clause = WhereClause::new();
        clause.push("owner_id = ?", [SqlValue::Int(1)]);
        clause.push(
            "(title LIKE ? OR description LIKE ?)",
            [SqlValue::Text("%a%".into()), SqlValue::Text("%a%".into())],
        );

        assert_eq!(clause.sql(), " WHERE owner_id = ? AND (title LIKE ? OR description LIKE ?)");
        assert_eq!(clause.values().len(), 3);
    }

    #[test]
    fn test_json_column_defaults() {
        let empty: Vec<String> = from_json_column(None).unwrap();
        assert!(empty.is_empty());
        let blank: Vec<String> = from_json_column(Some("  ".into())).unwrap();
        assert!(blank.is_empty());
        let list: Vec<String> = from_json_column(Some(r#"["a"]"#.into())).unwrap();
        assert_eq!(list, vec!["a".to_string()]);
        assert!(from_json_column::<Vec<String>>(Some("{".into())).is_err());
    }
}
