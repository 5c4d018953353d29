//! Store configuration.

use kvlite_core::schema::DEFAULT_TABLE;
use kvlite_snapshot::BackupConfig;
use kvlite_storage::SqliteConfig;

/// Configuration for a [`KvStore`](crate::KvStore).
///
/// # Examples
///
/// ```rust
/// use kvlite::{JournalMode, StoreConfig};
///
/// let config = StoreConfig::default()
///     .with_table("sessions")
///     .with_cleanup_on_close(false);
/// assert_eq!(config.table, "sessions");
/// assert_eq!(config.sqlite.journal_mode, JournalMode::Wal);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name of the table holding the entries
    pub table: String,
    /// Run `cleanup` before the backend is closed
    pub cleanup_on_close: bool,
    /// Make `LIKE` patterns case sensitive (SQLite's default is ASCII
    /// case-insensitive)
    pub case_sensitive_patterns: bool,
    /// Connection settings
    pub sqlite: SqliteConfig,
    /// Backup/restore settings
    pub backup: BackupConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            cleanup_on_close: true,
            case_sensitive_patterns: true,
            sqlite: SqliteConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Set the table name
    pub fn with_table<S: Into<String>>(mut self, table: S) -> Self {
        self.table = table.into();
        self
    }

    /// Enable or disable the final cleanup on close
    pub fn with_cleanup_on_close(mut self, enabled: bool) -> Self {
        self.cleanup_on_close = enabled;
        self
    }

    /// Enable or disable case-sensitive pattern matching
    pub fn with_case_sensitive_patterns(mut self, enabled: bool) -> Self {
        self.case_sensitive_patterns = enabled;
        self
    }

    /// Set the connection settings
    pub fn with_sqlite(mut self, sqlite: SqliteConfig) -> Self {
        self.sqlite = sqlite;
        self
    }

    /// Set the backup settings
    pub fn with_backup(mut self, backup: BackupConfig) -> Self {
        self.backup = backup;
        self
    }
}
