use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::comparison::Comparison;

/// Error type returned by a failing benchmark target.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of the baseline file and its lock.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File too small: {size} bytes (minimum {min_size} bytes required)")]
    FileTooSmall { size: u64, min_size: u64 },

    #[error("Invalid magic number: expected {expected:016x}, found {found:016x}")]
    InvalidMagic { expected: u64, found: u64 },

    #[error("Unsupported format version: {version} (supported: {supported})")]
    UnsupportedVersion { version: u32, supported: u32 },

    #[error("Invalid checksum: expected {expected:016x}, found {found:016x}")]
    InvalidChecksum { expected: u64, found: u64 },

    #[error("Corrupt record #{index}: {reason}")]
    CorruptRecord { index: u32, reason: String },

    #[error("{count} unexpected trailing bytes after the last record")]
    TrailingBytes { count: usize },

    #[error("Invalid record '{name}': {reason}")]
    InvalidRecord { name: String, reason: String },

    #[error("Timed out after {waited:?} waiting for lock on {}", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },
}

impl StorageError {
    pub fn io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt<T: Into<String>>(index: u32, reason: T) -> Self {
        StorageError::CorruptRecord {
            index,
            reason: reason.into(),
        }
    }

    pub fn invalid_record<N: Into<String>, T: Into<String>>(name: N, reason: T) -> Self {
        StorageError::InvalidRecord {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("{0}")]
    Regression(Box<Comparison>),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("benchmark target failed: {0}")]
    Target(#[source] BoxError),
}

impl BaselineError {
    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        BaselineError::Configuration(msg.into())
    }

    pub fn target<E: Into<BoxError>>(err: E) -> Self {
        BaselineError::Target(err.into())
    }

    /// The comparison that tripped the threshold, if this is a regression.
    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            BaselineError::Regression(comparison) => Some(comparison),
            _ => None,
        }
    }

    pub fn is_regression(&self) -> bool {
        matches!(self, BaselineError::Regression(_))
    }

    /// Hands back the error raised by the benchmark target, untouched.
    pub fn into_target_error(self) -> Result<BoxError, Self> {
        match self {
            BaselineError::Target(err) => Ok(err),
            other => Err(other),
        }
    }
}
