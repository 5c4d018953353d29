//! # kvlite Core
//!
//! Core types for the kvlite key-value store.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of kvlite.**
//! Depend on the main [`kvlite`](https://crates.io/crates/kvlite) crate
//! instead; this crate's API may change between minor versions.
//!
//! ---
//!
//! - [`value`]: the closed set of storable value kinds
//! - [`codec`]: self-describing binary encoding of values
//! - [`schema`]: the single-table statement set
//! - [`storage`]: the backend trait the store engine is generic over

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Self-describing binary encoding of values
pub mod codec;
pub mod error;
pub mod format_version;
pub mod schema;
pub mod storage;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use schema::Schema;
pub use storage::{Row, SqlValue, StorageBackend};
pub use value::{Value, ValueKind};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Absolute expiry timestamp for a TTL starting now, saturating on overflow.
pub fn expiry_after(ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl_ms)
}
