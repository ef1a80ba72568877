//! Constants for the baseline file format.
//!
//! Magic number, format version and field sizes for schema version 1.

/// Magic number for baseline files
pub const MAGIC_BYTES: [u8; 8] = [b'P', b'B', b'A', b'S', b'E', b'L', b'N', 0];

/// Current file format version
pub const FILE_FORMAT_VERSION: u32 = 1;

/// Header size in bytes (fixed for all files)
pub const HEADER_SIZE: usize = 32;

/// Default feature flags (currently none defined)
pub const DEFAULT_FEATURE_FLAGS: u32 = 0;

/// Header field offsets
pub mod header_offset {
    pub const MAGIC: usize = 0;
    pub const VERSION: usize = 8;
    pub const FLAGS: usize = 12;
    pub const RECORD_COUNT: usize = 16;
    pub const RESERVED: usize = 20;
    pub const CHECKSUM: usize = 24;
}

/// Record field sizes
pub mod record {
    pub const NAME_LEN_SIZE: usize = 2;
    pub const VALUE_SIZE: usize = 8;
    pub const CREATED_AT_SIZE: usize = 8;

    /// Bytes of a record excluding the name itself
    pub const FIXED_SIZE: usize = NAME_LEN_SIZE + VALUE_SIZE + CREATED_AT_SIZE;

    /// Longest encodable name in bytes
    pub const MAX_NAME_LENGTH: usize = u16::MAX as usize;
}

/// FNV-1a parameters for the file checksum
pub mod checksum {
    pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
}

/// Suffix of the sidecar file that carries the advisory lock
pub const LOCK_FILE_SUFFIX: &str = ".lock";
