//! File-backed baseline store.
//!
//! A store is a single binary file mapping benchmark names to their first recorded
//! timing. Records are immutable once written: [`BaselineStore::insert_if_absent`]
//! commits under an exclusive lock and never replaces an existing name, so the first
//! writer wins even when several processes race on the same file.
//!
//! The file is never cached across processes. Every store operation reads the file
//! from disk, and commits go through a temporary file that is renamed into place.

pub mod constants;
pub mod format;
pub mod lock;

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::StorageError;
use crate::record::{BaselineRecord, Insertion};

pub use lock::StoreLock;

/// Default bound on waiting for another process to release the store.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq)]
pub struct StoreOptions {
    /// How long a commit waits for the file lock before giving up.
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub struct BaselineStore {
    path: PathBuf,
    options: StoreOptions,
    records: BTreeMap<String, BaselineRecord>,
}

impl BaselineStore {
    /// Open the store at `path`. A missing file is an empty store; an unreadable or
    /// corrupt one is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let records = load_records(&path)?;
        debug!(store = %path.display(), records = records.len(), "opened baseline store");
        Ok(Self {
            path,
            options,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Look up `name` in the snapshot taken by the last open, reload or insert.
    pub fn get(&self, name: &str) -> Option<&BaselineRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Records in name order.
    pub fn records(&self) -> impl Iterator<Item = &BaselineRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Re-read the file, picking up records committed by other processes.
    pub fn reload(&mut self) -> Result<(), StorageError> {
        self.records = load_records(&self.path)?;
        Ok(())
    }

    /// Commit `value` under `name` unless a record already exists.
    ///
    /// Atomic across processes: the file lock is held while the file is re-read,
    /// checked and rewritten. If another writer got there first, nothing is written
    /// and the standing record is returned with `committed == false`.
    pub fn insert_if_absent(&mut self, name: &str, value: f64) -> Result<Insertion, StorageError> {
        let candidate = BaselineRecord::new(name, value);
        format::validate_record(&candidate)?;

        let _lock = StoreLock::acquire(&self.path, self.options.lock_timeout)?;
        let mut records = load_records(&self.path)?;

        if let Some(existing) = records.get(name) {
            let existing = existing.clone();
            self.records = records;
            debug!(name, baseline = existing.value, "baseline already present");
            return Ok(Insertion {
                committed: false,
                record: existing,
            });
        }

        records.insert(name.to_string(), candidate.clone());
        let bytes = format::encode_records(&records)?;
        persist_atomically(&self.path, &bytes)?;
        self.records = records;
        info!(
            name,
            baseline = value,
            store = %self.path.display(),
            "committed new baseline"
        );
        Ok(Insertion {
            committed: true,
            record: candidate,
        })
    }
}

fn load_records(path: &Path) -> Result<BTreeMap<String, BaselineRecord>, StorageError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    format::decode_records(&data)
}

fn persist_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StorageError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}
