//! Configuration for a [`Baseline`](crate::Baseline).
//!
//! Every field has a default and can be overridden from the environment, so test
//! suites and CI jobs can redirect the store file or relax the threshold without
//! code changes.
//!
//! | variable | field |
//! |---|---|
//! | `PERF_BASELINE_FILE` | [`BaselineConfig::path`] |
//! | `PERF_BASELINE_THRESHOLD` | [`BaselineConfig::threshold`] |
//! | `PERF_BASELINE_LOCK_TIMEOUT_MS` | [`BaselineConfig::lock_timeout`] |
//!
//! ```rust
//! use std::time::Duration;
//! use perf_baseline::BaselineConfig;
//!
//! let cfg = BaselineConfig::new("target/.perf-baseline")
//!     .with_threshold(1.8)
//!     .with_lock_timeout(Duration::from_secs(30));
//! assert!(cfg.validate().is_ok());
//! ```

use std::{env, path::PathBuf, time::Duration};

use crate::comparison::{DEFAULT_THRESHOLD, validate_threshold};
use crate::errors::BaselineError;
use crate::store::{DEFAULT_LOCK_TIMEOUT, StoreOptions};
use crate::timer::TimerConfig;

pub const ENV_FILE: &str = "PERF_BASELINE_FILE";
pub const ENV_THRESHOLD: &str = "PERF_BASELINE_THRESHOLD";
pub const ENV_LOCK_TIMEOUT_MS: &str = "PERF_BASELINE_LOCK_TIMEOUT_MS";

/// Store file used when neither the caller nor the environment names one.
pub const DEFAULT_STORE_FILE: &str = ".perf-baseline";

#[derive(Clone, Debug, PartialEq)]
pub struct BaselineConfig {
    /// Baseline file. Keep it out of version control: baselines only mean
    /// something on the machine that recorded them.
    pub path: PathBuf,
    /// Largest tolerated actual/baseline ratio.
    pub threshold: f64,
    /// Bound on waiting for another process holding the store lock.
    pub lock_timeout: Duration,
    pub timer: TimerConfig,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_FILE),
            threshold: DEFAULT_THRESHOLD,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            timer: TimerConfig::default(),
        }
    }
}

impl BaselineConfig {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by any `PERF_BASELINE_*` variables that are set.
    pub fn from_env() -> Result<Self, BaselineError> {
        Self::default().apply_env()
    }

    /// Override fields from `PERF_BASELINE_*` variables that are set.
    pub fn apply_env(self) -> Result<Self, BaselineError> {
        let mut config = self.apply_store_env()?;
        if let Some(raw) = read_var(ENV_THRESHOLD)? {
            config.threshold = raw.trim().parse::<f64>().map_err(|e| {
                BaselineError::configuration(format!("{ENV_THRESHOLD}={raw:?}: {e}"))
            })?;
        }
        Ok(config)
    }

    /// Override only the store location and lock timeout from the environment.
    pub fn apply_store_env(mut self) -> Result<Self, BaselineError> {
        if let Some(path) = env::var_os(ENV_FILE).filter(|p| !p.is_empty()) {
            self.path = PathBuf::from(path);
        }
        if let Some(raw) = read_var(ENV_LOCK_TIMEOUT_MS)? {
            let millis = raw.trim().parse::<u64>().map_err(|e| {
                BaselineError::configuration(format!("{ENV_LOCK_TIMEOUT_MS}={raw:?}: {e}"))
            })?;
            self.lock_timeout = Duration::from_millis(millis);
        }
        Ok(self)
    }

    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_timer(mut self, timer: TimerConfig) -> Self {
        self.timer = timer;
        self
    }

    pub fn validate(&self) -> Result<(), BaselineError> {
        validate_threshold(self.threshold)?;
        if self.path.as_os_str().is_empty() {
            return Err(BaselineError::configuration("store path is empty"));
        }
        if self.timer.repeat == 0 {
            return Err(BaselineError::configuration("timer repeat must be at least 1"));
        }
        if self.timer.max_loops == 0 {
            return Err(BaselineError::configuration("timer max_loops must be at least 1"));
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            lock_timeout: self.lock_timeout,
        }
    }
}

fn read_var(name: &str) -> Result<Option<String>, BaselineError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(BaselineError::configuration(format!(
            "{name} is not valid unicode"
        ))),
    }
}
