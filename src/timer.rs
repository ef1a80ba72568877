//! Wall-clock timing of a [`Target`].
//!
//! The timer first calibrates a loop count large enough that one batch of calls
//! clears `min_sample_time`, so calls faster than the clock resolution still produce
//! a meaningful figure. It then times `repeat` batches and reports the fastest one
//! per call; interference from the rest of the system only ever adds time.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::BoxError;
use crate::target::Target;

/// Floor applied to a batch the clock reported as taking no time at all.
const CLOCK_FLOOR_SECS: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// A calibrated batch must take at least this long.
    pub min_sample_time: Duration,
    /// Number of timed batches the minimum is taken over.
    pub repeat: usize,
    /// Upper bound on calls per batch, reached only by targets the clock cannot see.
    pub max_loops: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            min_sample_time: Duration::from_millis(200),
            repeat: 10,
            max_loops: 1_000_000_000,
        }
    }
}

/// Timing result of one [`Timer::measure`] call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Calls per batch.
    pub loops: u64,
    /// Elapsed time of each timed batch.
    pub samples: Vec<Duration>,
    /// Time spent finding `loops`.
    pub calibration: Duration,
    /// Seconds per call of the fastest batch; always positive.
    pub statistic: f64,
}

impl Measurement {
    pub fn ops_per_sec(&self) -> f64 {
        1.0 / self.statistic
    }

    pub fn fastest(&self) -> Option<Duration> {
        self.samples.iter().min().copied()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Timer {
    config: TimerConfig,
}

impl Timer {
    pub fn new(config: TimerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Measure seconds per call of `target`. `label` only appears in logs.
    ///
    /// The first error returned by the target ends the measurement and is handed
    /// back unchanged.
    pub fn measure(&self, target: &mut Target<'_>, label: &str) -> Result<Measurement, BoxError> {
        let started = Instant::now();
        let loops = self.calibrate(target)?;
        let calibration = started.elapsed();
        debug!(label, loops, ?calibration, "calibrated loop count");

        let repeat = self.config.repeat.max(1);
        let timing_started = Instant::now();
        let mut samples = Vec::with_capacity(repeat);
        for _ in 0..repeat {
            samples.push(time_batch(target, loops)?);
        }
        debug!(label, elapsed = ?timing_started.elapsed(), "timed batches");

        let fastest = samples.iter().min().copied().unwrap_or_default();
        let statistic = per_call(fastest, loops);
        info!(
            "{label}: {statistic:.9} sec/op = {:.3} ops/sec ({loops}x{repeat} runs sampled)",
            1.0 / statistic
        );
        Ok(Measurement {
            loops,
            samples,
            calibration,
            statistic,
        })
    }

    /// Find the smallest loop count in the 1-2-5 sequence whose batch clears
    /// `min_sample_time`.
    fn calibrate(&self, target: &mut Target<'_>) -> Result<u64, BoxError> {
        let max_loops = self.config.max_loops.max(1);
        let mut magnitude = 1u64;
        loop {
            for step in [1u64, 2, 5] {
                let loops = magnitude.saturating_mul(step).min(max_loops);
                let elapsed = time_batch(target, loops)?;
                if elapsed >= self.config.min_sample_time || loops == max_loops {
                    return Ok(loops);
                }
            }
            magnitude = magnitude.saturating_mul(10);
        }
    }
}

fn time_batch(target: &mut Target<'_>, loops: u64) -> Result<Duration, BoxError> {
    let start = Instant::now();
    for _ in 0..loops {
        target.invoke()?;
    }
    Ok(start.elapsed())
}

fn per_call(batch: Duration, loops: u64) -> f64 {
    let secs = batch.as_secs_f64().max(CLOCK_FLOOR_SECS);
    secs / loops as f64
}
