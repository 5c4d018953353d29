//! File-backed SQLite backend.

use crate::sqlite::{delegate_backend, sqlite_err, SqliteConfig, SqliteConnection};
use kvlite_core::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Persistent storage backend backed by a single SQLite database file.
pub struct FileBackend {
    inner: SqliteConnection,
    path: PathBuf,
}

impl FileBackend {
    /// Opens or creates the database file at `path`.
    ///
    /// Creates parent directories if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &SqliteConfig::default())
    }

    /// Opens or creates the database file with custom connection settings.
    pub fn open_with_config(path: impl AsRef<Path>, config: &SqliteConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path).map_err(sqlite_err("failed to open database file"))?;
        let inner = SqliteConnection::new(conn, path.display().to_string(), config)?;
        inner.set_journal_mode(config.journal_mode)?;
        inner.set_synchronous(config.synchronous)?;

        Ok(Self { inner, path })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

delegate_backend!(FileBackend);
