use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A committed baseline: the first timing ever stored under `name`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BaselineRecord {
    pub name: String,
    /// Seconds per call.
    pub value: f64,
    /// Seconds since the Unix epoch at commit time.
    pub created_at: u64,
}

impl BaselineRecord {
    pub fn new<N: Into<String>>(name: N, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            created_at: unix_now(),
        }
    }

    pub fn ops_per_sec(&self) -> f64 {
        1.0 / self.value
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {:.9} sec/op = {:.3} ops/sec (created_at={})",
            self.name,
            self.value,
            self.ops_per_sec(),
            self.created_at
        )
    }
}

/// Outcome of [`BaselineStore::insert_if_absent`](crate::store::BaselineStore::insert_if_absent).
#[derive(Clone, Debug, PartialEq)]
pub struct Insertion {
    /// `true` when this call wrote the record, `false` when a record already stood.
    pub committed: bool,
    /// The record now stored under the name.
    pub record: BaselineRecord,
}

impl Insertion {
    pub fn value(&self) -> f64 {
        self.record.value
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
