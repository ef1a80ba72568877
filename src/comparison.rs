use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::BaselineError;

/// Threshold used when none is configured: a 50% slowdown fails.
pub const DEFAULT_THRESHOLD: f64 = 1.5;

/// Outcome of one set-or-compare run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    pub name: String,
    pub baseline_value: f64,
    pub actual_value: f64,
    /// `actual_value / baseline_value`; above 1.0 means slower than the baseline.
    pub ratio: f64,
    pub threshold: f64,
    pub passed: bool,
    /// This run committed the baseline, so nothing was compared.
    pub baseline_created: bool,
}

impl Comparison {
    /// Result of the run that committed `value` as the baseline.
    pub fn baseline_set<N: Into<String>>(name: N, value: f64, threshold: f64) -> Self {
        Self {
            name: name.into(),
            baseline_value: value,
            actual_value: value,
            ratio: 1.0,
            threshold,
            passed: true,
            baseline_created: true,
        }
    }

    /// Compare `actual` against the stored `baseline`.
    ///
    /// Passes while `actual / baseline <= threshold`. A baseline that is zero,
    /// negative or not finite cannot anchor a ratio and is a configuration error.
    pub fn evaluate<N: Into<String>>(
        name: N,
        baseline: f64,
        actual: f64,
        threshold: f64,
    ) -> Result<Self, BaselineError> {
        let name = name.into();
        if !baseline.is_finite() || baseline <= 0.0 {
            return Err(BaselineError::configuration(format!(
                "baseline for '{name}' is {baseline}; a stored baseline must be a positive timing"
            )));
        }
        if !actual.is_finite() || actual < 0.0 {
            return Err(BaselineError::configuration(format!(
                "measured value for '{name}' is {actual}"
            )));
        }
        let ratio = actual / baseline;
        Ok(Self {
            name,
            baseline_value: baseline,
            actual_value: actual,
            ratio,
            threshold,
            passed: ratio <= threshold,
            baseline_created: false,
        })
    }

    pub fn is_regression(&self) -> bool {
        !self.passed
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.baseline_created {
            return write!(
                f,
                "{}: Baseline = {:.9} (new baseline committed)",
                self.name, self.baseline_value
            );
        }
        write!(
            f,
            "{}: Actual/Baseline = {:.9}/{:.9} = {:.3} (VS threshold {:.2})",
            self.name, self.actual_value, self.baseline_value, self.ratio, self.threshold
        )
    }
}

/// Reject thresholds that cannot bound a ratio.
pub fn validate_threshold(threshold: f64) -> Result<f64, BaselineError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(BaselineError::configuration(format!(
            "threshold must be a positive finite ratio, got {threshold}"
        )));
    }
    if threshold <= 1.0 {
        warn!(
            threshold,
            "threshold <= 1.0 fails on any slowdown, including measurement noise"
        );
    }
    Ok(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_at_threshold_passes() {
        let c = Comparison::evaluate("x", 2.0, 3.0, 1.5).unwrap();
        assert_eq!(c.ratio, 1.5);
        assert!(c.passed);
    }

    #[test]
    fn test_display_matches_log_format() {
        let c = Comparison::evaluate("add", 1.0, 2.0, 1.5).unwrap();
        assert_eq!(
            c.to_string(),
            "add: Actual/Baseline = 2.000000000/1.000000000 = 2.000 (VS threshold 1.50)"
        );
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(validate_threshold(0.0).is_err());
        assert!(validate_threshold(-1.0).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
        assert!(validate_threshold(f64::INFINITY).is_err());
        assert_eq!(validate_threshold(0.9).unwrap(), 0.9);
    }
}
