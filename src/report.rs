//! Where comparison outcomes go.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::comparison::Comparison;

/// Sink for comparison outcomes. Implementations must not panic.
pub trait Reporter: Send + Sync {
    fn emit(&self, comparison: &Comparison);
}

/// Emits one structured `tracing` event per comparison.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn emit(&self, c: &Comparison) {
        if c.passed {
            info!(
                name = %c.name,
                actual = c.actual_value,
                baseline = c.baseline_value,
                ratio = c.ratio,
                threshold = c.threshold,
                passed = c.passed,
                baseline_created = c.baseline_created,
                "{c}"
            );
        } else {
            warn!(
                name = %c.name,
                actual = c.actual_value,
                baseline = c.baseline_value,
                ratio = c.ratio,
                threshold = c.threshold,
                passed = c.passed,
                baseline_created = c.baseline_created,
                "performance regression: {c}"
            );
        }
    }
}

/// Keeps every comparison in memory; clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemoryReporter {
    entries: Arc<Mutex<Vec<Comparison>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Comparison> {
        self.entries.lock().clone()
    }

    pub fn last(&self) -> Option<Comparison> {
        self.entries.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, comparison: &Comparison) {
        self.entries.lock().push(comparison.clone());
    }
}
