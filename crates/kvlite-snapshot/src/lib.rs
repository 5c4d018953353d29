//! # kvlite Snapshot
//!
//! Backup and restore for kvlite stores.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of kvlite.**
//! Depend on the main [`kvlite`](https://crates.io/crates/kvlite) crate
//! instead; this crate's API may change between minor versions.
//!
//! ---
//!
//! A backup is the whole database image as produced by the backend, written
//! to a single file. Next to it a small sidecar (`<image>.meta`) records the
//! image size and CRC32 so a damaged or truncated image is caught before it
//! replaces live data.
//!
//! ```text
//! sidecar: [magic: u32 LE] [version: u16 LE] [bincode(BackupMeta)]
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use kvlite_snapshot::BackupManager;
//!
//! let manager = BackupManager::new();
//! let meta = manager.backup(&backend, "/backups/cache.db")?;
//! manager.restore(&mut backend, "/backups/cache.db")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use kvlite_core::format_version::{backup_meta_version, magic, BACKUP_META_FORMAT_VERSION};
use kvlite_core::{now_millis, Error, Result, StorageBackend};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sidecar file suffix
const META_SUFFIX: &str = ".meta";

/// Suffix of the in-progress image before it is renamed into place
const TMP_SUFFIX: &str = ".tmp";

const META_HEADER_LEN: usize = 6;

/// Backup metadata stored in the sidecar file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMeta {
    /// Timestamp when the backup was taken (Unix milliseconds)
    pub created_at: i64,
    /// Image size in bytes
    pub size: u64,
    /// CRC32 of the image
    pub checksum: u32,
}

/// Backup configuration
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Write a checksum sidecar next to each image
    pub write_meta: bool,
    /// Verify the image against its sidecar before restoring
    pub verify_checksums: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            write_meta: true,
            verify_checksums: true,
        }
    }
}

/// Writes and loads whole-database images
#[derive(Debug, Clone, Default)]
pub struct BackupManager {
    config: BackupConfig,
}

/// Appends `suffix` to the file name of `path`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Path of the sidecar file for an image.
pub fn meta_path(image: impl AsRef<Path>) -> PathBuf {
    with_suffix(image.as_ref(), META_SUFFIX)
}

impl BackupManager {
    /// Create a backup manager with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backup manager with custom configuration
    pub fn with_config(config: BackupConfig) -> Self {
        Self { config }
    }

    /// Writes the backend's image to `dest`.
    ///
    /// The image is first written to `<dest>.tmp` and renamed into place, so
    /// an interrupted backup never leaves a half-written file at `dest`.
    pub fn backup<B: StorageBackend>(&self, backend: &B, dest: impl AsRef<Path>) -> Result<BackupMeta> {
        let dest = dest.as_ref();
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = with_suffix(dest, TMP_SUFFIX);
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }
        if let Err(e) = backend.backup(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, dest)?;

        let meta = BackupMeta {
            created_at: now_millis(),
            size: fs::metadata(dest)?.len(),
            checksum: Self::compute_checksum(dest)?,
        };

        let sidecar = meta_path(dest);
        if self.config.write_meta {
            let tmp_meta = with_suffix(&sidecar, TMP_SUFFIX);
            Self::write_meta(&tmp_meta, &meta)?;
            fs::rename(&tmp_meta, &sidecar)?;
        } else if sidecar.exists() {
            // A sidecar from an earlier backup would not match this image
            fs::remove_file(&sidecar)?;
            debug!(path = %sidecar.display(), "removed stale backup sidecar");
        }

        info!(
            path = %dest.display(),
            size = meta.size,
            checksum = meta.checksum,
            "backup written"
        );
        Ok(meta)
    }

    /// Replaces the backend's contents with the image at `src`.
    ///
    /// When a sidecar exists and checksum verification is enabled, a size or
    /// CRC mismatch fails with [`Error::Corruption`] and the backend is left
    /// untouched. Returns the sidecar metadata if one was found.
    pub fn restore<B: StorageBackend>(
        &self,
        backend: &mut B,
        src: impl AsRef<Path>,
    ) -> Result<Option<BackupMeta>> {
        let src = src.as_ref();
        if !src.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("backup image not found: {}", src.display()),
            )));
        }

        let sidecar = meta_path(src);
        let meta = if sidecar.exists() {
            Some(Self::read_meta(&sidecar)?)
        } else {
            debug!(path = %src.display(), "no backup sidecar, skipping verification");
            None
        };

        if let (Some(meta), true) = (&meta, self.config.verify_checksums) {
            Self::verify(src, meta)?;
        }

        backend.restore(src)?;
        info!(path = %src.display(), "backup restored");
        Ok(meta)
    }

    /// Checks an image against its metadata.
    pub fn verify(image: &Path, meta: &BackupMeta) -> Result<()> {
        let size = fs::metadata(image)?.len();
        if size != meta.size {
            warn!(path = %image.display(), expected = meta.size, actual = size, "backup size mismatch");
            return Err(Error::Corruption(format!(
                "size mismatch for {}: expected {}, got {}",
                image.display(),
                meta.size,
                size
            )));
        }

        let checksum = Self::compute_checksum(image)?;
        if checksum != meta.checksum {
            warn!(path = %image.display(), "backup checksum mismatch");
            return Err(Error::Corruption(format!(
                "checksum mismatch for {}: expected {}, got {}",
                image.display(),
                meta.checksum,
                checksum
            )));
        }
        Ok(())
    }

    /// Compute CRC32 checksum of a file
    fn compute_checksum(path: &Path) -> Result<u32> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = crc32fast::Hasher::new();

        let mut buffer = [0u8; 8192];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize())
    }

    fn write_meta(path: &Path, meta: &BackupMeta) -> Result<()> {
        let encoded = bincode::serialize(meta)
            .map_err(|e| Error::Backend(format!("failed to encode backup metadata: {}", e)))?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&magic::BACKUP_META.to_le_bytes())?;
        writer.write_all(&BACKUP_META_FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&encoded)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads backup metadata from a sidecar file.
    pub fn read_meta(path: &Path) -> Result<BackupMeta> {
        let contents = fs::read(path)?;
        if contents.len() < META_HEADER_LEN {
            return Err(Error::Corruption(format!(
                "backup metadata too short: {}",
                path.display()
            )));
        }

        let magic_bytes = u32::from_le_bytes([contents[0], contents[1], contents[2], contents[3]]);
        if magic_bytes != magic::BACKUP_META {
            return Err(Error::Corruption(format!(
                "bad backup metadata magic in {}",
                path.display()
            )));
        }
        let version = u16::from_le_bytes([contents[4], contents[5]]);
        if !backup_meta_version().can_read(version) {
            return Err(Error::Corruption(format!(
                "unsupported backup metadata version {}",
                version
            )));
        }

        bincode::deserialize(&contents[META_HEADER_LEN..])
            .map_err(|e| Error::Corruption(format!("invalid backup metadata: {}", e)))
    }
}
