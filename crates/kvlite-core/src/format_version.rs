//! On-disk format versions for kvlite.
//!
//! Encoded values and backup sidecar files both carry a magic number and a
//! version so that foreign or future data is rejected instead of misread.

/// Encoded value format version
pub const VALUE_FORMAT_VERSION: u16 = 1;

/// Backup metadata format version
pub const BACKUP_META_FORMAT_VERSION: u16 = 1;

/// Magic numbers for data validation
pub mod magic {
    /// Encoded value magic: "KVV" followed by a zero byte
    pub const VALUE: [u8; 4] = *b"KVV\0";

    /// Backup sidecar magic: "KVLB" (KvLite Backup)
    pub const BACKUP_META: u32 = 0x4B564C42;
}

/// Version compatibility information
pub struct FormatVersion {
    /// Current version of this format
    pub current: u16,
    /// Minimum supported version for reading
    pub min_read: u16,
}

impl FormatVersion {
    /// Check if a version can be read
    pub fn can_read(&self, version: u16) -> bool {
        version >= self.min_read && version <= self.current
    }
}

/// Encoded value format version info
pub fn value_version() -> FormatVersion {
    FormatVersion {
        current: VALUE_FORMAT_VERSION,
        min_read: 1,
    }
}

/// Backup metadata format version info
pub fn backup_meta_version() -> FormatVersion {
    FormatVersion {
        current: BACKUP_META_FORMAT_VERSION,
        min_read: 1,
    }
}
