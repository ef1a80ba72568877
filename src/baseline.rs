//! The set-or-compare workflow.
//!
//! The first run under a name commits its measurement as the baseline. Every later
//! run measures again and is compared against that first value, never against the
//! previous run, so a series of small slowdowns cannot walk the reference point
//! upwards. To recalibrate, delete the store file and run again on the same machine.

use std::{fmt, path::Path, thread};

use tracing::info;

use crate::comparison::{Comparison, DEFAULT_THRESHOLD};
use crate::config::BaselineConfig;
use crate::errors::BaselineError;
use crate::record::Insertion;
use crate::report::{Reporter, TracingReporter};
use crate::store::BaselineStore;
use crate::target::Target;
use crate::timer::{Timer, TimerConfig};

pub struct Baseline {
    store: BaselineStore,
    threshold: f64,
    timer: Timer,
    default_name: Option<String>,
    reporter: Box<dyn Reporter>,
}

impl Baseline {
    /// Baselines stored in `path`, failing on a ratio above `threshold`
    /// (default [`DEFAULT_THRESHOLD`]).
    pub fn open<P: AsRef<Path>>(path: P, threshold: Option<f64>) -> Result<Self, BaselineError> {
        let config = BaselineConfig::new(path.as_ref())
            .with_threshold(threshold.unwrap_or(DEFAULT_THRESHOLD));
        Self::from_config(&config)
    }

    pub fn from_config(config: &BaselineConfig) -> Result<Self, BaselineError> {
        config.validate()?;
        let store = BaselineStore::open_with(&config.path, config.store_options())?;
        info!(
            store = %config.path.display(),
            threshold = config.threshold,
            records = store.len(),
            "baseline file"
        );
        Ok(Self {
            store,
            threshold: config.threshold,
            timer: Timer::new(config.timer.clone()),
            default_name: None,
            reporter: Box::new(TracingReporter),
        })
    }

    /// Name used when a call passes none, typically the invoking test's name.
    pub fn with_default_name<N: Into<String>>(mut self, name: N) -> Self {
        self.default_name = Some(name.into());
        self
    }

    pub fn with_reporter<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn with_timer(mut self, config: TimerConfig) -> Self {
        self.timer = Timer::new(config);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Measure `target` and set or compare its baseline, returning the comparison
    /// whether it passed or not.
    pub fn compare(
        &mut self,
        target: &mut Target<'_>,
        name: Option<&str>,
    ) -> Result<Comparison, BaselineError> {
        let name = self.resolve_name(name)?;
        let measurement = self
            .timer
            .measure(target, &name)
            .map_err(BaselineError::Target)?;
        self.check(&name, measurement.statistic)
    }

    /// As [`compare`](Self::compare), but a failed comparison is returned as
    /// [`BaselineError::Regression`].
    pub fn set_or_compare(
        &mut self,
        target: &mut Target<'_>,
        name: Option<&str>,
    ) -> Result<Comparison, BaselineError> {
        let comparison = self.compare(target, name)?;
        if comparison.passed {
            Ok(comparison)
        } else {
            Err(BaselineError::Regression(Box::new(comparison)))
        }
    }

    /// Set or compare the baseline for an already measured `actual` (seconds per call).
    ///
    /// A name that already has a baseline is compared without taking the store lock
    /// or writing anything, so a read-only store still serves comparisons.
    pub fn check(&mut self, name: &str, actual: f64) -> Result<Comparison, BaselineError> {
        if !actual.is_finite() || actual <= 0.0 {
            return Err(BaselineError::configuration(format!(
                "measured value for '{name}' is {actual}; expected positive seconds per call"
            )));
        }
        self.store.reload()?;
        let insertion = match self.store.get(name) {
            Some(existing) => Insertion {
                committed: false,
                record: existing.clone(),
            },
            None => self.store.insert_if_absent(name, actual)?,
        };

        let comparison = if insertion.committed {
            Comparison::baseline_set(name, actual, self.threshold)
        } else {
            Comparison::evaluate(name, insertion.value(), actual, self.threshold)?
        };
        self.reporter.emit(&comparison);
        Ok(comparison)
    }

    /// Explicit name, then the default name, then the current thread's name. The
    /// test harness runs each test on a thread named after the test path.
    pub fn resolve_name(&self, name: Option<&str>) -> Result<String, BaselineError> {
        if let Some(name) = name.or(self.default_name.as_deref()) {
            if name.is_empty() {
                return Err(BaselineError::configuration("benchmark name is empty"));
            }
            return Ok(name.to_string());
        }
        current_test_name().ok_or_else(|| {
            BaselineError::configuration(
                "no benchmark name given and the current thread has no test name",
            )
        })
    }
}

impl fmt::Debug for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Baseline")
            .field("store", &self.store.path())
            .field("threshold", &self.threshold)
            .field("timer", self.timer.config())
            .field("default_name", &self.default_name)
            .finish()
    }
}

/// Name of the current thread unless it is the unnamed or `main` thread.
pub fn current_test_name() -> Option<String> {
    thread::current()
        .name()
        .filter(|name| !name.is_empty() && *name != "main")
        .map(str::to_string)
}
