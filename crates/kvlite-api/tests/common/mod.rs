// Common test utilities for kvlite integration tests

use kvlite::{FileBackend, KvStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture that owns a temporary directory for database files
pub struct StoreFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
}

impl StoreFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("kv.db");
        Self { temp_dir, db_path }
    }

    /// Opens (or reopens) the file-backed store
    pub fn open(&self) -> KvStore<FileBackend> {
        KvStore::open(&self.db_path).expect("Failed to open store")
    }

    /// Path for an auxiliary file inside the fixture directory
    #[allow(dead_code)]
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}
