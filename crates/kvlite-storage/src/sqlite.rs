//! Shared rusqlite connection wrapper.
//!
//! Both backends own one [`SqliteConnection`]. It maps the backend verbs
//! onto cached prepared statements and translates between rusqlite's
//! value types and [`SqlValue`].

use kvlite_core::{Error, Result, Row, SqlValue};
use rusqlite::backup::Progress;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection, DatabaseName};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Default busy timeout (5 seconds)
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of cached prepared statements
const DEFAULT_STATEMENT_CACHE: usize = 32;

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Rollback journal deleted after each transaction
    Delete,
    /// Write-ahead log (concurrent readers, one writer)
    Wal,
    /// Journal kept in memory
    Memory,
}

impl JournalMode {
    fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
        }
    }
}

/// SQLite `synchronous` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// No fsync (fastest, least durable)
    Off,
    /// fsync at critical moments
    Normal,
    /// fsync on every commit
    Full,
}

impl SyncMode {
    fn as_pragma(self) -> &'static str {
        match self {
            SyncMode::Off => "OFF",
            SyncMode::Normal => "NORMAL",
            SyncMode::Full => "FULL",
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// How long a statement waits on a locked database
    pub busy_timeout: Duration,
    /// Journal mode for file databases (in-memory always uses `Memory`)
    pub journal_mode: JournalMode,
    /// Sync mode for file databases
    pub synchronous: SyncMode,
    /// Capacity of the prepared statement cache
    pub statement_cache_capacity: usize,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            journal_mode: JournalMode::Wal,
            synchronous: SyncMode::Normal,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE,
        }
    }
}

impl SqliteConfig {
    /// Set the journal mode
    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Set the sync mode
    pub fn with_synchronous(mut self, mode: SyncMode) -> Self {
        self.synchronous = mode;
        self
    }

    /// Set the busy timeout
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Maps a rusqlite failure into the backend error bucket.
pub(crate) fn sqlite_err(context: &str) -> impl Fn(rusqlite::Error) -> Error + '_ {
    move |e| Error::Backend(format!("{}: {}", context, e))
}

fn to_sqlite(value: &SqlValue) -> SqliteValue {
    match value {
        SqlValue::Null => SqliteValue::Null,
        SqlValue::Integer(n) => SqliteValue::Integer(*n),
        SqlValue::Text(s) => SqliteValue::Text(s.clone()),
        SqlValue::Blob(b) => SqliteValue::Blob(b.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Result<SqlValue> {
    match value {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(n) => Ok(SqlValue::Integer(n)),
        ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec())
            .map(SqlValue::Text)
            .map_err(|e| Error::Backend(format!("invalid UTF-8 in text column: {}", e))),
        ValueRef::Blob(bytes) => Ok(SqlValue::Blob(bytes.to_vec())),
        ValueRef::Real(n) => Err(Error::Backend(format!("unexpected REAL column: {}", n))),
    }
}

/// An owned SQLite connection that can be closed explicitly.
pub struct SqliteConnection {
    conn: Option<Connection>,
    label: String,
}

impl SqliteConnection {
    /// Applies configuration shared by all backends.
    pub(crate) fn new(conn: Connection, label: String, config: &SqliteConfig) -> Result<Self> {
        conn.busy_timeout(config.busy_timeout)
            .map_err(sqlite_err("failed to set busy timeout"))?;
        conn.set_prepared_statement_cache_capacity(config.statement_cache_capacity);
        info!(backend = %label, "opened sqlite connection");
        Ok(Self {
            conn: Some(conn),
            label,
        })
    }

    /// Sets a pragma that reports its new value (e.g. `journal_mode`).
    pub(crate) fn set_journal_mode(&self, mode: JournalMode) -> Result<()> {
        let applied: String = self
            .conn()?
            .pragma_update_and_check(None, "journal_mode", mode.as_pragma(), |row| row.get(0))
            .map_err(sqlite_err("failed to set journal_mode"))?;
        debug!(backend = %self.label, journal_mode = %applied, "journal mode applied");
        Ok(())
    }

    pub(crate) fn set_synchronous(&self, mode: SyncMode) -> Result<()> {
        self.conn()?
            .pragma_update(None, "synchronous", mode.as_pragma())
            .map_err(sqlite_err("failed to set synchronous"))
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::Closed)
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(Error::Closed)
    }

    pub(crate) fn exec(&self, sql: &str) -> Result<()> {
        self.conn()?
            .execute_batch(sql)
            .map_err(sqlite_err("failed to execute batch"))
    }

    pub(crate) fn run(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(sqlite_err("failed to prepare statement"))?;
        stmt.execute(params_from_iter(params.iter().map(to_sqlite)))
            .map_err(sqlite_err("failed to execute statement"))
    }

    pub(crate) fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.query(sql, params, usize::MAX)
    }

    pub(crate) fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>> {
        Ok(self.query(sql, params, 1)?.into_iter().next())
    }

    fn query(&self, sql: &str, params: &[SqlValue], max_rows: usize) -> Result<Vec<Row>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(sqlite_err("failed to prepare query"))?;
        let column_count = stmt.column_count();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(to_sqlite)))
            .map_err(sqlite_err("failed to execute query"))?;

        let mut out = Vec::new();
        while out.len() < max_rows {
            let Some(row) = rows.next().map_err(sqlite_err("failed to fetch row"))? else {
                break;
            };
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row.get_ref(i).map_err(sqlite_err("failed to read column"))?;
                values.push(from_sqlite(value)?);
            }
            out.push(values);
        }
        Ok(out)
    }

    pub(crate) fn begin(&self) -> Result<()> {
        self.exec("BEGIN IMMEDIATE")
    }

    pub(crate) fn commit(&self) -> Result<()> {
        self.exec("COMMIT")
    }

    pub(crate) fn rollback(&self) -> Result<()> {
        self.exec("ROLLBACK")
    }

    pub(crate) fn vacuum(&self) -> Result<()> {
        self.exec("VACUUM")
    }

    pub(crate) fn backup(&self, path: &Path) -> Result<()> {
        self.conn()?
            .backup(DatabaseName::Main, path, None)
            .map_err(sqlite_err("backup failed"))?;
        info!(backend = %self.label, path = %path.display(), "database image written");
        Ok(())
    }

    pub(crate) fn restore(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("backup image not found: {}", path.display()),
            )));
        }
        let label = self.label.clone();
        let conn = self.conn_mut()?;
        conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)
            .map_err(sqlite_err("restore failed"))?;
        conn.flush_prepared_statement_cache();
        info!(backend = %label, path = %path.display(), "database image restored");
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| Error::Backend(format!("failed to close connection: {}", e)))?;
            info!(backend = %self.label, "closed sqlite connection");
        }
        Ok(())
    }

    pub(crate) fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

/// Implements [`kvlite_core::StorageBackend`] for a type wrapping a
/// `SqliteConnection` in field `inner`.
macro_rules! delegate_backend {
    ($ty:ty) => {
        impl kvlite_core::StorageBackend for $ty {
            fn exec(&self, sql: &str) -> kvlite_core::Result<()> {
                self.inner.exec(sql)
            }

            fn run(&self, sql: &str, params: &[kvlite_core::SqlValue]) -> kvlite_core::Result<usize> {
                self.inner.run(sql, params)
            }

            fn get(
                &self,
                sql: &str,
                params: &[kvlite_core::SqlValue],
            ) -> kvlite_core::Result<Option<kvlite_core::Row>> {
                self.inner.get(sql, params)
            }

            fn all(
                &self,
                sql: &str,
                params: &[kvlite_core::SqlValue],
            ) -> kvlite_core::Result<Vec<kvlite_core::Row>> {
                self.inner.all(sql, params)
            }

            fn begin(&self) -> kvlite_core::Result<()> {
                self.inner.begin()
            }

            fn commit(&self) -> kvlite_core::Result<()> {
                self.inner.commit()
            }

            fn rollback(&self) -> kvlite_core::Result<()> {
                self.inner.rollback()
            }

            fn vacuum(&self) -> kvlite_core::Result<()> {
                self.inner.vacuum()
            }

            fn backup(&self, path: &std::path::Path) -> kvlite_core::Result<()> {
                self.inner.backup(path)
            }

            fn restore(&mut self, path: &std::path::Path) -> kvlite_core::Result<()> {
                self.inner.restore(path)
            }

            fn close(&mut self) -> kvlite_core::Result<()> {
                self.inner.close()
            }

            fn is_open(&self) -> bool {
                self.inner.is_open()
            }
        }
    };
}

pub(crate) use delegate_backend;
