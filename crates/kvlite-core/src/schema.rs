//! Schema and statement set.
//!
//! kvlite stores every entry in one table:
//!
//! ```text
//! CREATE TABLE kv (
//!     key        TEXT PRIMARY KEY,
//!     value      BLOB NOT NULL,
//!     expires_at INTEGER NULL      -- unix millis, NULL = never expires
//! );
//! CREATE INDEX kv_expires_at ON kv (expires_at);
//! ```
//!
//! Key listings are ordered by the implicit `rowid`, i.e. insertion order.
//! Upserts and renames update rows in place and keep their position.
//!
//! [`Schema`] renders the fixed verb set for a given table name once, so the
//! store engine only ever binds parameters.

use crate::{Error, Result};

/// Default table name
pub const DEFAULT_TABLE: &str = "kv";

/// Maximum length of a table name
const MAX_TABLE_NAME_LEN: usize = 64;

/// Pattern that matches every key
pub const MATCH_ALL: &str = "%";

/// Rendered statements for one kv table.
///
/// Parameter order is documented per statement; `?n` placeholders are
/// positional.
#[derive(Debug, Clone)]
pub struct Schema {
    table: String,
    /// DDL: create table and expiration index (idempotent)
    pub create: String,
    /// DDL: drop table and index
    pub drop: String,
    /// `(key)` → `(value, expires_at)`
    pub select_entry: String,
    /// `(key, value, expires_at)` upsert
    pub upsert: String,
    /// `(key)` → `(1)`
    pub exists: String,
    /// `(key)`
    pub delete: String,
    /// `(key, now)`, removes the row only if it has expired
    pub delete_if_expired: String,
    /// `(old_key, new_key)`
    pub rename: String,
    /// `(key, expires_at)`
    pub update_expire: String,
    /// `(key)` → `(expires_at)`
    pub select_expire: String,
    /// `(pattern)` → `(key)*` in insertion order
    pub select_keys: String,
    /// `(pattern, limit, offset)` → `(key)*` in insertion order
    pub select_keys_page: String,
    /// `(pattern)` → `(count)`
    pub count: String,
    /// `(pattern, now)` → `(count)`
    pub count_expired: String,
    /// `(now)`
    pub delete_expired: String,
}

/// Rejects anything but `[A-Za-z_][A-Za-z0-9_]*`.
///
/// Table names are spliced into SQL text, so they are never taken from
/// untrusted input without this check.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !valid_start
        || name.len() > MAX_TABLE_NAME_LEN
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::Validation(format!("invalid table name: {:?}", name)));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(Error::Validation(format!(
            "table name {:?} uses the reserved sqlite_ prefix",
            name
        )));
    }
    Ok(())
}

impl Schema {
    /// Renders the statement set for `table`.
    pub fn new(table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let t = table;
        Ok(Self {
            table: t.to_string(),
            create: format!(
                "CREATE TABLE IF NOT EXISTS {t} (\
                     key TEXT PRIMARY KEY NOT NULL, \
                     value BLOB NOT NULL, \
                     expires_at INTEGER NULL\
                 );\
                 CREATE INDEX IF NOT EXISTS {t}_expires_at ON {t} (expires_at);"
            ),
            drop: format!("DROP INDEX IF EXISTS {t}_expires_at; DROP TABLE IF EXISTS {t};"),
            select_entry: format!("SELECT value, expires_at FROM {t} WHERE key = ?1"),
            upsert: format!(
                "INSERT INTO {t} (key, value, expires_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at"
            ),
            exists: format!("SELECT 1 FROM {t} WHERE key = ?1"),
            delete: format!("DELETE FROM {t} WHERE key = ?1"),
            delete_if_expired: format!(
                "DELETE FROM {t} WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2"
            ),
            rename: format!("UPDATE OR REPLACE {t} SET key = ?2 WHERE key = ?1"),
            update_expire: format!("UPDATE {t} SET expires_at = ?2 WHERE key = ?1"),
            select_expire: format!("SELECT expires_at FROM {t} WHERE key = ?1"),
            select_keys: format!("SELECT key FROM {t} WHERE key LIKE ?1 ORDER BY rowid"),
            select_keys_page: format!(
                "SELECT key FROM {t} WHERE key LIKE ?1 ORDER BY rowid LIMIT ?2 OFFSET ?3"
            ),
            count: format!("SELECT COUNT(*) FROM {t} WHERE key LIKE ?1"),
            count_expired: format!(
                "SELECT COUNT(*) FROM {t} WHERE key LIKE ?1 \
                 AND expires_at IS NOT NULL AND expires_at <= ?2"
            ),
            delete_expired: format!(
                "DELETE FROM {t} WHERE expires_at IS NOT NULL AND expires_at <= ?1"
            ),
        })
    }

    /// Table name this schema was rendered for.
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("kv").is_ok());
        assert!(validate_table_name("_cache_v2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2fast").is_err());
        assert!(validate_table_name("kv; DROP TABLE x").is_err());
        assert!(validate_table_name("sqlite_master").is_err());
        assert!(validate_table_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_statements_use_table() {
        let schema = Schema::new("sessions").unwrap();
        assert_eq!(schema.table(), "sessions");
        assert!(schema.create.contains("CREATE TABLE IF NOT EXISTS sessions"));
        assert!(schema.create.contains("sessions_expires_at ON sessions (expires_at)"));
        assert!(schema.upsert.contains("ON CONFLICT(key)"));
        assert!(schema.select_keys.ends_with("ORDER BY rowid"));
        assert!(schema.select_keys_page.contains("ORDER BY rowid LIMIT ?2"));
    }
}
