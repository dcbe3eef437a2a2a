//! Fixed-interval energy series.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Tolerance when checking that an interval splits a day into whole steps.
const INTERVAL_EPS: f64 = 1e-9;

/// Per-interval energy values (kWh) with a fixed interval duration.
///
/// # Examples
///
/// ```
/// use battery_roi::series::TimeSeries;
///
/// let ts = TimeSeries::hourly(vec![0.5, 1.0, 0.25]);
/// assert_eq!(ts.len(), 3);
/// assert_eq!(ts.total(), 1.75);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Energy per interval in kWh.
    pub values: Vec<f64>,
    /// Interval duration in hours.
    pub dt_hours: f64,
}

impl TimeSeries {
    pub fn new(values: Vec<f64>, dt_hours: f64) -> Self {
        Self { values, dt_hours }
    }

    /// Hourly series (`dt_hours = 1.0`).
    pub fn hourly(values: Vec<f64>) -> Self {
        Self::new(values, 1.0)
    }

    /// Quarter-hourly series (`dt_hours = 0.25`).
    pub fn quarter_hourly(values: Vec<f64>) -> Self {
        Self::new(values, 0.25)
    }

    /// Guesses the interval from a full-year step count: 30 000 steps or more
    /// is quarter-hourly, anything shorter hourly.
    pub fn with_inferred_interval(values: Vec<f64>) -> Self {
        let dt = if values.len() >= 30_000 { 0.25 } else { 1.0 };
        Self::new(values, dt)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Number of steps in one day for this interval.
    pub fn steps_per_day(&self) -> usize {
        steps_per_day(self.dt_hours)
    }
}

/// Steps per day for a given interval, rounded to the nearest whole step.
pub fn steps_per_day(dt_hours: f64) -> usize {
    if dt_hours <= 0.0 {
        return 1;
    }
    ((24.0 / dt_hours).round() as usize).max(1)
}

/// Checks that `dt_hours` is positive and splits a day into whole steps.
pub fn validate_interval(dt_hours: f64) -> EngineResult<()> {
    if !dt_hours.is_finite() || dt_hours <= 0.0 || dt_hours > 24.0 {
        return Err(EngineError::InvalidInterval(format!(
            "interval must be in (0, 24] hours, got {dt_hours}"
        )));
    }
    let per_day = 24.0 / dt_hours;
    if (per_day - per_day.round()).abs() > INTERVAL_EPS {
        return Err(EngineError::InvalidInterval(format!(
            "interval of {dt_hours} h does not divide a day into whole steps"
        )));
    }
    Ok(())
}

/// Validates that load and PV can be simulated together.
///
/// Both must be non-empty, equally long and share one valid interval.
pub fn check_aligned(load: &TimeSeries, pv: &TimeSeries) -> EngineResult<()> {
    if load.is_empty() {
        return Err(EngineError::LengthMismatch {
            what: "load series must be non-empty",
            expected: pv.len().max(1),
            actual: 0,
        });
    }
    if load.len() != pv.len() {
        return Err(EngineError::LengthMismatch {
            what: "pv series vs load series",
            expected: load.len(),
            actual: pv.len(),
        });
    }
    validate_interval(load.dt_hours)?;
    if (load.dt_hours - pv.dt_hours).abs() > INTERVAL_EPS {
        return Err(EngineError::InvalidInterval(format!(
            "load interval {} h differs from pv interval {} h",
            load.dt_hours, pv.dt_hours
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inferred_interval_switches_on_step_count() {
        assert_eq!(TimeSeries::with_inferred_interval(vec![0.0; 8760]).dt_hours, 1.0);
        assert_eq!(
            TimeSeries::with_inferred_interval(vec![0.0; 35_040]).dt_hours,
            0.25
        );
    }

    #[test]
    fn steps_per_day_for_common_intervals() {
        assert_eq!(steps_per_day(1.0), 24);
        assert_eq!(steps_per_day(0.25), 96);
        assert_eq!(steps_per_day(0.5), 48);
    }

    #[test]
    fn interval_must_divide_a_day() {
        assert!(validate_interval(0.25).is_ok());
        assert!(validate_interval(1.0).is_ok());
        assert!(validate_interval(0.7).is_err());
        assert!(validate_interval(0.0).is_err());
        assert!(validate_interval(f64::NAN).is_err());
    }

    #[test]
    fn empty_series_is_a_length_mismatch() {
        let empty = TimeSeries::hourly(vec![]);
        let err = check_aligned(&empty, &empty).unwrap_err();
        assert!(matches!(err, EngineError::LengthMismatch { .. }));
    }

    #[test]
    fn differing_lengths_rejected() {
        let load = TimeSeries::hourly(vec![1.0, 2.0]);
        let pv = TimeSeries::hourly(vec![1.0]);
        assert_eq!(
            check_aligned(&load, &pv),
            Err(EngineError::LengthMismatch {
                what: "pv series vs load series",
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn differing_intervals_rejected() {
        let load = TimeSeries::hourly(vec![1.0, 2.0]);
        let pv = TimeSeries::quarter_hourly(vec![1.0, 2.0]);
        assert!(matches!(
            check_aligned(&load, &pv),
            Err(EngineError::InvalidInterval(_))
        ));
    }
}
