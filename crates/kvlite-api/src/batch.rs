//! Multi-key operations and the transaction coordinator.
//!
//! Each batch runs its per-key store calls inside one backend transaction:
//! either every key is applied or, on the first error, the whole batch is
//! rolled back and that error is returned.

use crate::store::KvStore;
use kvlite_core::{expiry_after, Result, StorageBackend, Value};
use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// One item of a [`KvStore::multi_set`] batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Key to write
    pub key: String,
    /// Value to store
    pub value: Value,
    /// Absolute expiry in Unix milliseconds, `None` = never
    pub expires_at: Option<i64>,
}

impl Entry {
    /// An entry that never expires.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires_at: None,
        }
    }

    /// Set an absolute expiry
    pub fn expires_at(mut self, at: i64) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Set an expiry relative to now
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(expiry_after(ttl));
        self
    }
}

/// Clears the in-transaction flag when the outermost transaction ends.
struct TransactionScope<'a>(&'a Cell<bool>);

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<B: StorageBackend> KvStore<B> {
    /// Runs `f` atomically.
    ///
    /// Commits if `f` returns `Ok`, rolls back otherwise. Calls nested
    /// inside an open transaction join it rather than starting a new one,
    /// so an inner error still aborts the outermost transaction.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kvlite::KvStore;
    ///
    /// let store = KvStore::in_memory()?;
    /// store.transaction(|s| {
    ///     s.set("a", 1, None)?;
    ///     s.set("b", 2, None)
    /// })?;
    /// assert_eq!(store.count(None)?, 2);
    /// # Ok::<(), kvlite::Error>(())
    /// ```
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.ensure_open()?;
        if self.in_transaction.get() {
            return f(self);
        }

        self.in_transaction.set(true);
        let _scope = TransactionScope(&self.in_transaction);
        self.backend.transaction(|_| f(self))
    }

    /// Reads several keys in one transaction.
    ///
    /// Every requested key appears in the result, mapped to `None` when it
    /// is missing or expired. Expired rows are reclaimed inside the same
    /// transaction.
    pub fn multi_get<K: AsRef<str>>(&self, keys: &[K]) -> Result<HashMap<String, Option<Value>>> {
        let found = self.transaction(|store| {
            let mut found = HashMap::with_capacity(keys.len());
            for key in keys {
                let key = key.as_ref();
                found.insert(key.to_string(), store.get(key)?);
            }
            Ok(found)
        })?;
        debug!(requested = keys.len(), "multi_get");
        Ok(found)
    }

    /// Writes several entries in one transaction, in input order.
    ///
    /// If any entry fails to encode or write, none of them are stored.
    pub fn multi_set(&self, entries: &[Entry]) -> Result<()> {
        self.transaction(|store| {
            entries
                .iter()
                .try_for_each(|e| store.set_value(&e.key, &e.value, e.expires_at))
        })?;
        debug!(count = entries.len(), "multi_set");
        Ok(())
    }

    /// Deletes several keys in one transaction. Returns how many rows were
    /// removed.
    pub fn multi_delete<K: AsRef<str>>(&self, keys: &[K]) -> Result<usize> {
        let removed = self.transaction(|store| {
            let mut removed = 0;
            for key in keys {
                if store.delete(key.as_ref())? {
                    removed += 1;
                }
            }
            Ok(removed)
        })?;
        debug!(requested = keys.len(), removed, "multi_delete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use kvlite_core::{now_millis, Error, Row, SqlValue};
    use kvlite_storage::MemoryBackend;
    use std::path::Path;

    /// Memory backend whose next `failing_commits` commits fail without
    /// ending the transaction.
    struct FailingCommit {
        inner: MemoryBackend,
        failing_commits: Cell<usize>,
        rollbacks: Cell<usize>,
    }

    impl StorageBackend for FailingCommit {
        fn exec(&self, sql: &str) -> Result<()> {
            self.inner.exec(sql)
        }
        fn run(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
            self.inner.run(sql, params)
        }
        fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>> {
            self.inner.get(sql, params)
        }
        fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
            self.inner.all(sql, params)
        }
        fn begin(&self) -> Result<()> {
            self.inner.begin()
        }
        fn commit(&self) -> Result<()> {
            let remaining = self.failing_commits.get();
            if remaining > 0 {
                self.failing_commits.set(remaining - 1);
                return Err(Error::backend("commit failed"));
            }
            self.inner.commit()
        }
        fn rollback(&self) -> Result<()> {
            self.rollbacks.set(self.rollbacks.get() + 1);
            self.inner.rollback()
        }
        fn vacuum(&self) -> Result<()> {
            self.inner.vacuum()
        }
        fn backup(&self, path: &Path) -> Result<()> {
            self.inner.backup(path)
        }
        fn restore(&mut self, path: &Path) -> Result<()> {
            self.inner.restore(path)
        }
        fn close(&mut self) -> Result<()> {
            self.inner.close()
        }
        fn is_open(&self) -> bool {
            self.inner.is_open()
        }
    }

    #[test]
    fn test_multi_set_and_get() {
        let store = KvStore::in_memory().unwrap();
        store
            .multi_set(&[Entry::new("a", 1), Entry::new("b", "two")])
            .unwrap();

        let found = store.multi_get(&["a", "b", "c"]).unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found["a"], Some(Value::Int(1)));
        assert_eq!(found["b"], Some(Value::from("two")));
        assert_eq!(found["c"], None);
    }

    #[test]
    fn test_multi_set_rolls_back_on_encode_failure() {
        let store = KvStore::in_memory().unwrap();
        let err = store
            .multi_set(&[Entry::new("x", 1), Entry::new("y", f64::NAN)])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!store.exists("x").unwrap());
        assert!(!store.exists("y").unwrap());
    }

    #[test]
    fn test_multi_get_reclaims_expired() {
        let store = KvStore::in_memory().unwrap();
        store
            .multi_set(&[
                Entry::new("live", 1),
                Entry::new("dead", 2).expires_at(now_millis() - 1),
            ])
            .unwrap();

        let found = store.multi_get(&["live", "dead"]).unwrap();
        assert_eq!(found["live"], Some(Value::Int(1)));
        assert_eq!(found["dead"], None);
        assert!(!store.exists("dead").unwrap());
    }

    #[test]
    fn test_multi_delete() {
        let store = KvStore::in_memory().unwrap();
        store
            .multi_set(&[Entry::new("a", 1), Entry::new("b", 2), Entry::new("c", 3)])
            .unwrap();
        assert_eq!(store.multi_delete(&["a", "c", "missing"]).unwrap(), 2);
        assert_eq!(store.keys(None).unwrap(), vec!["b"]);
    }

    #[test]
    fn test_nested_transaction_joins_outer() {
        let store = KvStore::in_memory().unwrap();
        let result: Result<()> = store.transaction(|s| {
            s.multi_set(&[Entry::new("inner", 1)])?;
            Err(Error::validation("abort outer"))
        });
        assert!(result.is_err());
        assert!(!store.exists("inner").unwrap());
    }

    #[test]
    fn test_transaction_flag_resets() {
        let store = KvStore::in_memory().unwrap();
        let _ = store.transaction(|_| -> Result<()> { Err(Error::validation("x")) });
        // A fresh transaction must begin a real backend transaction again
        store.multi_set(&[Entry::new("a", 1)]).unwrap();
        assert!(store.exists("a").unwrap());
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let backend = FailingCommit {
            inner: MemoryBackend::new().unwrap(),
            failing_commits: Cell::new(1),
            rollbacks: Cell::new(0),
        };
        let store = KvStore::new(backend, StoreConfig::default()).unwrap();

        let err = store.multi_set(&[Entry::new("a", 1)]).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        assert_eq!(store.backend().rollbacks.get(), 1);
        assert!(!store.exists("a").unwrap());

        // The store is not left inside the aborted transaction
        store.multi_set(&[Entry::new("b", 2)]).unwrap();
        assert_eq!(store.get("b").unwrap(), Some(Value::Int(2)));
    }
}
