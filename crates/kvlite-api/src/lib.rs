//! # kvlite
//!
//! A typed key-value store with per-key expiration, pattern scans, atomic
//! batches and whole-database backups, built on embedded SQLite.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kvlite::{KvStore, Value};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Persistent store (a single SQLite file)
//!     let mut store = KvStore::open("./data/cache.db")?;
//!
//!     store.set("user:1:name", "Alice", None)?;
//!     store.set_with_ttl("session:abc", vec![1u8, 2, 3], Duration::from_secs(60))?;
//!
//!     if let Some(name) = store.get("user:1:name")? {
//!         println!("Name: {:?}", name.as_str());
//!     }
//!
//!     // Keys are matched with SQL LIKE patterns
//!     let users = store.keys(Some("user:%"))?;
//!     println!("{} user keys", users.len());
//!
//!     // Reclaims expired rows, then releases the file
//!     store.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! [`KvStore`] is generic over [`StorageBackend`]. Two SQLite backends ship
//! with the crate:
//!
//! ```rust,no_run
//! use kvlite::KvStore;
//!
//! // File-backed (recommended for anything that must survive restarts)
//! let persistent = KvStore::open("./data/kv.db")?;
//!
//! // In-memory (fast, lost on close unless backed up)
//! let scratch = KvStore::in_memory()?;
//! # Ok::<(), kvlite::Error>(())
//! ```
//!
//! ## Values
//!
//! Values keep their kind through storage: `Value::Bool(false)`,
//! `Value::Int(0)` and `Value::Null` stay distinct, and binary data is
//! stored losslessly.
//!
//! ## Errors
//!
//! Every error maps to one of three kinds via [`Error::kind`]:
//! validation (bad input), decode (corrupt stored bytes) and backend
//! (storage failure or closed store). Nothing is retried automatically.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod config;
pub mod logging;
pub mod store;

pub use batch::Entry;
pub use config::StoreConfig;
pub use store::{Expiry, KvStore, StoreStats};

// Re-export core types
pub use kvlite_core::{
    codec, expiry_after, now_millis, Error, ErrorKind, Result, Row, SqlValue, StorageBackend,
    Value, ValueKind,
};

// Backends
pub use kvlite_storage::{FileBackend, JournalMode, MemoryBackend, SqliteConfig, SyncMode};

// Backup components
pub use kvlite_snapshot::{BackupConfig, BackupManager, BackupMeta};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.3.0");
    }

    #[test]
    fn test_backend_types_reexported() {
        let backend = MemoryBackend::new().unwrap();
        let row: Option<Row> = backend.get("SELECT ?1", &[SqlValue::Integer(7)]).unwrap();
        assert_eq!(row, Some(vec![SqlValue::Integer(7)]));
    }

    #[test]
    fn test_reexports_work_together() {
        let store: KvStore<MemoryBackend> = KvStore::in_memory().unwrap();
        store.set("k", Value::Bytes(vec![0, 1]), None).unwrap();
        assert_eq!(
            store.get("k").unwrap().map(|v| v.kind()),
            Some(ValueKind::Bytes)
        );
    }
}
