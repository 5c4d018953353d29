//! The store engine.
//!
//! Every operation is one or more statements from [`Schema`] run against the
//! backend. Values pass through the codec on the way in and out.
//!
//! ## Expiration
//!
//! An entry whose `expires_at` is at or before now is logically absent to
//! [`get`](KvStore::get). Reading such an entry deletes that one row. Bulk
//! reclamation only happens through [`cleanup`](KvStore::cleanup) (also run
//! on close). The raw-state operations ([`exists`](KvStore::exists),
//! [`keys`](KvStore::keys), [`count`](KvStore::count),
//! [`get_expire`](KvStore::get_expire), [`rename`](KvStore::rename)) see
//! expired rows until they are reclaimed.

use crate::config::StoreConfig;
use kvlite_core::schema::MATCH_ALL;
use kvlite_core::{codec, expiry_after, now_millis, Error, Result, Row, Schema, SqlValue, StorageBackend, Value};
use kvlite_snapshot::{BackupManager, BackupMeta};
use kvlite_storage::{FileBackend, MemoryBackend};
use std::cell::Cell;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Expiration state of a key, as reported by [`KvStore::expiry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// No row exists for the key
    Missing,
    /// The row never expires
    Never,
    /// The row expires at this Unix millisecond timestamp
    At(i64),
}

/// Row counts returned by [`KvStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// All rows, expired or not
    pub total: u64,
    /// Rows whose expiry has passed but which have not been reclaimed
    pub expired: u64,
}

/// A typed key-value store on top of a [`StorageBackend`].
///
/// The store owns its backend exclusively. It is meant to be driven from a
/// single thread; share it behind a `Mutex` if several threads need it.
///
/// # Examples
///
/// ```rust
/// use kvlite::{KvStore, Value};
///
/// let store = KvStore::in_memory()?;
/// store.set("user:1", "alice", None)?;
/// assert_eq!(store.get("user:1")?, Some(Value::from("alice")));
/// # Ok::<(), kvlite::Error>(())
/// ```
pub struct KvStore<B: StorageBackend> {
    pub(crate) backend: B,
    pub(crate) schema: Schema,
    config: StoreConfig,
    backups: BackupManager,
    pub(crate) in_transaction: Cell<bool>,
}

/// Rejects keys the store never accepts.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::validation("key must not be empty"));
    }
    if key.contains('\0') {
        return Err(Error::validation("key must not contain NUL"));
    }
    Ok(())
}

fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.contains('\0') {
        return Err(Error::validation("pattern must not contain NUL"));
    }
    Ok(())
}

fn is_expired(expires_at: Option<i64>, now: i64) -> bool {
    matches!(expires_at, Some(at) if at <= now)
}

fn first_column(row: Option<Row>) -> Result<SqlValue> {
    row.and_then(|r| r.into_iter().next())
        .ok_or_else(|| Error::backend("query returned no rows"))
}

fn count_from(row: Option<Row>) -> Result<u64> {
    let n = first_column(row)?.into_i64()?;
    Ok(n.max(0) as u64)
}

impl KvStore<MemoryBackend> {
    /// Creates a store backed by a fresh in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_config(StoreConfig::default())
    }

    /// Creates an in-memory store with custom configuration.
    pub fn in_memory_with_config(config: StoreConfig) -> Result<Self> {
        let backend = MemoryBackend::with_config(&config.sqlite)?;
        Self::new(backend, config)
    }
}

impl KvStore<FileBackend> {
    /// Opens or creates a store in the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Opens or creates a file-backed store with custom configuration.
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let backend = FileBackend::open_with_config(path, &config.sqlite)?;
        Self::new(backend, config)
    }
}

impl<B: StorageBackend> KvStore<B> {
    /// Wraps an open backend, creating the table and index if needed.
    pub fn new(backend: B, config: StoreConfig) -> Result<Self> {
        let schema = Schema::new(&config.table)?;
        let backups = BackupManager::with_config(config.backup.clone());
        let store = Self {
            backend,
            schema,
            config,
            backups,
            in_transaction: Cell::new(false),
        };
        store.init_schema()?;
        info!(table = %store.schema.table(), "kv store ready");
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let pragma = if self.config.case_sensitive_patterns {
            "PRAGMA case_sensitive_like = ON"
        } else {
            "PRAGMA case_sensitive_like = OFF"
        };
        self.backend.exec(pragma)?;
        self.backend.exec(&self.schema.create)
    }

    /// Returns the configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Borrows the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        !self.backend.is_open()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.backend.is_open() {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    /// Retrieves the value stored under `key`.
    ///
    /// Returns `None` if the key is missing or expired. An expired row is
    /// deleted as a side effect; this is not an error.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_open()?;
        validate_key(key)?;

        let Some(row) = self.backend.get(&self.schema.select_entry, &[key.into()])? else {
            trace!(key, "get: miss");
            return Ok(None);
        };
        let mut columns = row.into_iter();
        let (Some(value), Some(expires_at)) = (columns.next(), columns.next()) else {
            return Err(Error::backend("entry row has unexpected shape"));
        };
        let expires_at = expires_at.into_opt_i64()?;

        let now = now_millis();
        if is_expired(expires_at, now) {
            self.backend
                .run(&self.schema.delete_if_expired, &[key.into(), now.into()])?;
            debug!(key, "get: reclaimed expired entry");
            return Ok(None);
        }

        trace!(key, "get: hit");
        codec::decode(&value.into_blob()?).map(Some)
    }

    /// Stores `value` under `key`, replacing any existing value and expiry.
    ///
    /// `expires_at` is an absolute Unix millisecond timestamp; `None` means
    /// the entry never expires. A timestamp in the past is accepted and
    /// makes the entry immediately invisible to `get`.
    pub fn set(&self, key: &str, value: impl Into<Value>, expires_at: Option<i64>) -> Result<()> {
        self.set_value(key, &value.into(), expires_at)
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    pub fn set_with_ttl(&self, key: &str, value: impl Into<Value>, ttl: Duration) -> Result<()> {
        self.set_value(key, &value.into(), Some(expiry_after(ttl)))
    }

    pub(crate) fn set_value(&self, key: &str, value: &Value, expires_at: Option<i64>) -> Result<()> {
        self.ensure_open()?;
        validate_key(key)?;
        let encoded = codec::encode(value)?;
        let size = encoded.len();
        self.backend.run(
            &self.schema.upsert,
            &[key.into(), encoded.into(), expires_at.into()],
        )?;
        debug!(key, size, ?expires_at, "set");
        Ok(())
    }

    /// Whether a row exists for `key`.
    ///
    /// This reflects physical presence and does not check expiry: an
    /// expired row that has not been reclaimed yet still exists. Use
    /// [`get`](Self::get) for an expiry-aware check.
    pub fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        validate_key(key)?;
        Ok(self.backend.get(&self.schema.exists, &[key.into()])?.is_some())
    }

    /// Removes `key`. Returns whether a row was removed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        validate_key(key)?;
        let removed = self.backend.run(&self.schema.delete, &[key.into()])? > 0;
        debug!(key, removed, "delete");
        Ok(removed)
    }

    /// Moves the row at `old_key` to `new_key`, value and expiry included.
    ///
    /// An existing row at `new_key` is overwritten. If `old_key` has no row
    /// nothing changes and `false` is returned. Like `exists`, this acts on
    /// the raw row, so an expired-but-unreclaimed entry is moved as is.
    pub fn rename(&self, old_key: &str, new_key: &str) -> Result<bool> {
        self.ensure_open()?;
        validate_key(old_key)?;
        validate_key(new_key)?;
        let renamed = self
            .backend
            .run(&self.schema.rename, &[old_key.into(), new_key.into()])?
            > 0;
        debug!(old_key, new_key, renamed, "rename");
        Ok(renamed)
    }

    /// Sets or clears (`None`) the expiry of `key` without touching its
    /// value. Returns `false` if the key has no row.
    pub fn set_expire(&self, key: &str, expires_at: Option<i64>) -> Result<bool> {
        self.ensure_open()?;
        validate_key(key)?;
        let updated = self
            .backend
            .run(&self.schema.update_expire, &[key.into(), expires_at.into()])?
            > 0;
        debug!(key, ?expires_at, updated, "set_expire");
        Ok(updated)
    }

    /// Returns the expiry timestamp of `key`.
    ///
    /// `None` is returned both for entries that never expire and for
    /// missing keys. Use [`expiry`](Self::expiry) to tell them apart.
    pub fn get_expire(&self, key: &str) -> Result<Option<i64>> {
        Ok(match self.expiry(key)? {
            Expiry::At(at) => Some(at),
            Expiry::Never | Expiry::Missing => None,
        })
    }

    /// Returns the expiration state of `key`.
    pub fn expiry(&self, key: &str) -> Result<Expiry> {
        self.ensure_open()?;
        validate_key(key)?;
        match self.backend.get(&self.schema.select_expire, &[key.into()])? {
            None => Ok(Expiry::Missing),
            Some(row) => match first_column(Some(row))?.into_opt_i64()? {
                None => Ok(Expiry::Never),
                Some(at) => Ok(Expiry::At(at)),
            },
        }
    }

    /// Lists keys matching a `LIKE` pattern (`None` matches all) in
    /// insertion order. Overwriting or renaming a key keeps its position.
    /// Expired rows that have not been reclaimed are included.
    pub fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        self.ensure_open()?;
        let pattern = pattern.unwrap_or(MATCH_ALL);
        validate_pattern(pattern)?;
        self.backend
            .all(&self.schema.select_keys, &[pattern.into()])?
            .into_iter()
            .map(|row| first_column(Some(row))?.into_text())
            .collect()
    }

    /// Returns page `page` (1-based) of `limit` keys matching `pattern`.
    ///
    /// Page `n` holds the keys at positions `(n - 1) * limit ..
    /// n * limit` of the [`keys`](Self::keys) ordering.
    pub fn pagination(&self, limit: usize, page: usize, pattern: Option<&str>) -> Result<Vec<String>> {
        self.ensure_open()?;
        if limit == 0 {
            return Err(Error::validation("limit must be positive"));
        }
        if page == 0 {
            return Err(Error::validation("page numbers start at 1"));
        }
        let pattern = pattern.unwrap_or(MATCH_ALL);
        validate_pattern(pattern)?;

        let offset = (page - 1)
            .checked_mul(limit)
            .and_then(|o| i64::try_from(o).ok())
            .ok_or_else(|| Error::validation("page offset out of range"))?;
        let limit = i64::try_from(limit).map_err(|_| Error::validation("limit out of range"))?;

        self.backend
            .all(
                &self.schema.select_keys_page,
                &[pattern.into(), limit.into(), offset.into()],
            )?
            .into_iter()
            .map(|row| first_column(Some(row))?.into_text())
            .collect()
    }

    /// Counts rows matching `pattern`, expired or not.
    pub fn count(&self, pattern: Option<&str>) -> Result<u64> {
        self.ensure_open()?;
        let pattern = pattern.unwrap_or(MATCH_ALL);
        validate_pattern(pattern)?;
        count_from(self.backend.get(&self.schema.count, &[pattern.into()])?)
    }

    /// Counts rows matching `pattern` whose expiry has passed.
    pub fn count_expired(&self, pattern: Option<&str>) -> Result<u64> {
        self.ensure_open()?;
        let pattern = pattern.unwrap_or(MATCH_ALL);
        validate_pattern(pattern)?;
        count_from(
            self.backend
                .get(&self.schema.count_expired, &[pattern.into(), now_millis().into()])?,
        )
    }

    /// Returns total and expired row counts.
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            total: self.count(None)?,
            expired: self.count_expired(None)?,
        })
    }

    /// Deletes every row whose expiry has passed. Returns how many rows
    /// were removed.
    pub fn cleanup(&self) -> Result<usize> {
        self.ensure_open()?;
        let removed = self
            .backend
            .run(&self.schema.delete_expired, &[now_millis().into()])?;
        debug!(removed, "cleanup");
        Ok(removed)
    }

    /// Compacts the database file.
    pub fn vacuum(&self) -> Result<()> {
        self.ensure_open()?;
        self.backend.vacuum()?;
        info!("vacuum complete");
        Ok(())
    }

    /// Drops and recreates the table, deleting every entry.
    pub fn flush(&self) -> Result<()> {
        self.transaction(|store| {
            store.backend.exec(&store.schema.drop)?;
            store.backend.exec(&store.schema.create)
        })?;
        info!(table = %self.schema.table(), "store flushed");
        Ok(())
    }

    /// Writes the whole database image to `path`.
    pub fn backup(&self, path: impl AsRef<Path>) -> Result<BackupMeta> {
        self.ensure_open()?;
        self.backups.backup(&self.backend, path)
    }

    /// Replaces the whole database with the image at `path`.
    ///
    /// The table is recreated afterwards if the image did not contain it.
    /// Restoring needs `&mut self`, so it cannot run inside
    /// [`transaction`](Self::transaction), whose closure only gets `&Self`.
    pub fn restore(&mut self, path: impl AsRef<Path>) -> Result<Option<BackupMeta>> {
        self.ensure_open()?;
        let meta = self.backups.restore(&mut self.backend, path)?;
        self.init_schema()?;
        Ok(meta)
    }

    /// Runs a final cleanup (if configured) and closes the backend.
    ///
    /// Every later operation fails with [`Error::Closed`]. Closing an
    /// already closed store is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.backend.is_open() {
            return Ok(());
        }
        if self.config.cleanup_on_close {
            let removed = self.cleanup()?;
            debug!(removed, "final cleanup before close");
        }
        self.backend.close()?;
        info!(table = %self.schema.table(), "kv store closed");
        Ok(())
    }
}

impl<B: StorageBackend> Drop for KvStore<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close kv store on drop");
        }
    }
}
