//! In-memory SQLite backend.
//!
//! Uses SQLite's `:memory:` mode. All data is lost when the backend is
//! closed or dropped unless it was written out with `backup`.

use crate::sqlite::{delegate_backend, sqlite_err, JournalMode, SqliteConfig, SqliteConnection};
use kvlite_core::Result;
use rusqlite::Connection;

/// In-memory storage backend.
///
/// Ideal for tests, caches and scratch data. A backup taken from it is a
/// regular SQLite file that a [`FileBackend`](crate::FileBackend) can
/// open directly.
pub struct MemoryBackend {
    inner: SqliteConnection,
}

impl MemoryBackend {
    /// Creates a new empty in-memory database.
    pub fn new() -> Result<Self> {
        Self::with_config(&SqliteConfig::default())
    }

    /// Creates a new in-memory database with custom connection settings.
    ///
    /// `journal_mode` and `synchronous` are ignored: there is no file to
    /// sync.
    pub fn with_config(config: &SqliteConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(sqlite_err("failed to create in-memory database"))?;
        let inner = SqliteConnection::new(conn, ":memory:".to_string(), config)?;
        inner.set_journal_mode(JournalMode::Memory)?;
        Ok(Self { inner })
    }
}

delegate_backend!(MemoryBackend);

#[cfg(test)]
mod tests {
    use super::*;
    use kvlite_core::{Error, SqlValue, StorageBackend};

    fn backend_with_table() -> MemoryBackend {
        let backend = MemoryBackend::new().unwrap();
        backend
            .exec("CREATE TABLE t (k TEXT PRIMARY KEY, v BLOB, n INTEGER)")
            .unwrap();
        backend
    }

    #[test]
    fn test_run_get_all() {
        let backend = backend_with_table();
        let changed = backend
            .run(
                "INSERT INTO t VALUES (?1, ?2, ?3)",
                &[SqlValue::from("a"), SqlValue::Blob(vec![1, 2]), SqlValue::Null],
            )
            .unwrap();
        assert_eq!(changed, 1);
        backend
            .run(
                "INSERT INTO t VALUES (?1, ?2, ?3)",
                &[SqlValue::from("b"), SqlValue::Blob(vec![3]), SqlValue::Integer(7)],
            )
            .unwrap();

        let row = backend
            .get("SELECT v, n FROM t WHERE k = ?1", &[SqlValue::from("a")])
            .unwrap()
            .unwrap();
        assert_eq!(row, vec![SqlValue::Blob(vec![1, 2]), SqlValue::Null]);

        let rows = backend.all("SELECT k FROM t ORDER BY k", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], SqlValue::Text("b".into()));

        assert!(backend
            .get("SELECT v FROM t WHERE k = ?1", &[SqlValue::from("zzz")])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_transaction_rollback() {
        let backend = backend_with_table();
        let result: Result<()> = backend.transaction(|b| {
            b.run("INSERT INTO t (k, v) VALUES ('x', x'00')", &[])?;
            Err(Error::validation("abort"))
        });
        assert!(result.is_err());

        let rows = backend.all("SELECT k FROM t", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_transaction_commit() {
        let backend = backend_with_table();
        let n = backend
            .transaction(|b| b.run("INSERT INTO t (k, v) VALUES ('x', x'00')", &[]))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(backend.all("SELECT k FROM t", &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_closed_backend_rejects_statements() {
        let mut backend = backend_with_table();
        backend.close().unwrap();
        assert!(!backend.is_open());
        assert!(matches!(backend.all("SELECT k FROM t", &[]), Err(Error::Closed)));
        assert!(matches!(backend.begin(), Err(Error::Closed)));
        // Closing twice is fine
        backend.close().unwrap();
    }

    #[test]
    fn test_sql_error_is_backend_error() {
        let backend = backend_with_table();
        let err = backend.run("INSERT INTO missing VALUES (1)", &[]).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }
}
