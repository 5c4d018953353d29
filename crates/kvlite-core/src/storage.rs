//! Storage backend abstraction.
//!
//! The store engine never talks to a concrete database. It drives a
//! [`StorageBackend`], which exposes the minimal statement-execution verbs
//! (`run`, `get`, `all`), transaction control, whole-image backup/restore
//! and an explicit close.

use crate::{Error, Result};
use std::path::Path;

/// A parameter bound to, or a column read from, a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// 64-bit integer
    Integer(i64),
    /// UTF-8 text
    Text(String),
    /// Binary blob
    Blob(Vec<u8>),
}

/// One result row, columns in select order.
pub type Row = Vec<SqlValue>;

impl SqlValue {
    /// Reads an optional integer column (`NULL` → `None`).
    pub fn into_opt_i64(self) -> Result<Option<i64>> {
        match self {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(n) => Ok(Some(n)),
            other => Err(Error::Backend(format!("expected integer column, got {:?}", other))),
        }
    }

    /// Reads a non-null integer column.
    pub fn into_i64(self) -> Result<i64> {
        self.into_opt_i64()?
            .ok_or_else(|| Error::backend("expected integer column, got NULL"))
    }

    /// Reads a text column.
    pub fn into_text(self) -> Result<String> {
        match self {
            SqlValue::Text(s) => Ok(s),
            other => Err(Error::Backend(format!("expected text column, got {:?}", other))),
        }
    }

    /// Reads a blob column.
    ///
    /// A column holding anything else means the row was not written by
    /// kvlite, so this is reported as a decode failure.
    pub fn into_blob(self) -> Result<Vec<u8>> {
        match self {
            SqlValue::Blob(b) => Ok(b),
            other => Err(Error::Decode(format!("expected blob column, got {:?}", other))),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(b: Vec<u8>) -> Self {
        SqlValue::Blob(b)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(n: Option<i64>) -> Self {
        n.map(SqlValue::Integer).unwrap_or(SqlValue::Null)
    }
}

/// Statement-execution capability of an embedded relational engine.
///
/// Implementations own their connection exclusively. After [`close`]
/// every method must fail with [`Error::Closed`].
///
/// [`close`]: StorageBackend::close
pub trait StorageBackend {
    /// Executes one or more DDL statements with no parameters.
    fn exec(&self, sql: &str) -> Result<()>;

    /// Executes a mutating statement, returning the number of changed rows.
    fn run(&self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    /// Executes a query and returns its first row, if any.
    fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>>;

    /// Executes a query and returns all rows.
    fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Opens a transaction.
    fn begin(&self) -> Result<()>;

    /// Commits the open transaction.
    fn commit(&self) -> Result<()>;

    /// Rolls back the open transaction.
    fn rollback(&self) -> Result<()>;

    /// Compacts the underlying storage.
    fn vacuum(&self) -> Result<()>;

    /// Writes the whole database image to `path`.
    fn backup(&self, path: &Path) -> Result<()>;

    /// Replaces the whole database image with the one stored at `path`.
    fn restore(&mut self, path: &Path) -> Result<()>;

    /// Releases the connection. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Whether the backend still accepts statements.
    fn is_open(&self) -> bool;

    /// Runs `f` inside a transaction, committing on success and rolling
    /// back on any error, including a failed commit.
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T>,
    {
        self.begin()?;
        let result = f(self).and_then(|value| self.commit().map(|()| value));
        if result.is_err() {
            // A failed COMMIT can leave the transaction open. The original
            // error wins over a failed rollback.
            let _ = self.rollback();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_conversions() {
        assert_eq!(SqlValue::Null.into_opt_i64().unwrap(), None);
        assert_eq!(SqlValue::Integer(5).into_i64().unwrap(), 5);
        assert!(SqlValue::Null.into_i64().is_err());
        assert_eq!(SqlValue::from("k").into_text().unwrap(), "k");
        assert!(matches!(
            SqlValue::Text("x".into()).into_blob(),
            Err(Error::Decode(_))
        ));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
    }
}
