//! # kvlite Storage
//!
//! SQLite storage backends for kvlite.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of kvlite.**
//! Depend on the main [`kvlite`](https://crates.io/crates/kvlite) crate
//! instead; this crate's API may change between minor versions.
//!
//! ---
//!
//! Two implementations of [`kvlite_core::StorageBackend`] are provided,
//! one per target environment:
//!
//! - [`MemoryBackend`]: SQLite `:memory:` database
//! - [`FileBackend`]: single SQLite database file on disk
//!
//! Both run every statement through rusqlite's prepared statement cache.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use sqlite::{JournalMode, SqliteConfig, SyncMode};
