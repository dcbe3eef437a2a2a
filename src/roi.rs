//! Multi-year payback projection of a battery investment.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_HORIZON_YEARS: u32 = 15;

/// Investment and ageing parameters of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoiConfig {
    /// Up-front battery cost.
    pub investment: f64,
    /// Yearly loss of saving, e.g. 0.02 for 2 %.
    pub degradation: f64,
    pub horizon_years: u32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            investment: 0.0,
            degradation: 0.02,
            horizon_years: DEFAULT_HORIZON_YEARS,
        }
    }
}

impl RoiConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.investment.is_finite() || self.investment < 0.0 {
            return Err(EngineError::invalid("roi.investment", "must be >= 0"));
        }
        if !(0.0..1.0).contains(&self.degradation) {
            return Err(EngineError::invalid("roi.degradation", "must be in [0, 1)"));
        }
        if self.horizon_years == 0 {
            return Err(EngineError::invalid("roi.horizon_years", "must be >= 1"));
        }
        Ok(())
    }
}

/// Outcome of the payback projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiResult {
    pub first_year_saving: f64,
    /// First year in which the cumulative saving covers the investment.
    pub payback_year: Option<u32>,
    /// Net return over the horizon as a percentage of the investment.
    pub roi_percent: f64,
    pub cumulative_saving: f64,
    /// Saving per year, year 1 first. Empty for degenerate inputs.
    pub yearly_savings: Vec<f64>,
}

/// Projects a first-year saving over the horizon with geometric degradation.
///
/// Year `y` saves `first_year_saving * (1 - degradation)^(y - 1)`. An
/// investment or saving that is not positive yields no payback and 0 %.
///
/// # Examples
///
/// ```
/// use battery_roi::roi::{RoiConfig, project};
///
/// let cfg = RoiConfig { investment: 1000.0, degradation: 0.0, horizon_years: 15 };
/// let r = project(250.0, &cfg);
/// assert_eq!(r.payback_year, Some(4));
/// assert!((r.roi_percent - 275.0).abs() < 1e-9);
/// ```
pub fn project(first_year_saving: f64, cfg: &RoiConfig) -> RoiResult {
    if cfg.investment <= 0.0 || first_year_saving <= 0.0 {
        return RoiResult {
            first_year_saving,
            payback_year: None,
            roi_percent: 0.0,
            cumulative_saving: 0.0,
            yearly_savings: Vec::new(),
        };
    }

    let mut cumulative = 0.0;
    let mut payback_year = None;
    let mut yearly_savings = Vec::with_capacity(cfg.horizon_years as usize);

    for year in 1..=cfg.horizon_years {
        let saving = first_year_saving * (1.0 - cfg.degradation).powi(year as i32 - 1);
        cumulative += saving;
        yearly_savings.push(saving);
        if payback_year.is_none() && cumulative >= cfg.investment {
            payback_year = Some(year);
        }
    }

    RoiResult {
        first_year_saving,
        payback_year,
        roi_percent: (cumulative - cfg.investment) / cfg.investment * 100.0,
        cumulative_saving: cumulative,
        yearly_savings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(investment: f64, degradation: f64) -> RoiConfig {
        RoiConfig {
            investment,
            degradation,
            horizon_years: DEFAULT_HORIZON_YEARS,
        }
    }

    #[test]
    fn degradation_shrinks_each_year() {
        let r = project(100.0, &cfg(500.0, 0.1));
        assert_eq!(r.yearly_savings.len(), 15);
        assert!((r.yearly_savings[1] - 90.0).abs() < 1e-9);
        assert!((r.yearly_savings[2] - 81.0).abs() < 1e-9);
    }

    #[test]
    fn payback_is_first_year_covering_investment() {
        let r = project(100.0, &cfg(300.0, 0.0));
        assert_eq!(r.payback_year, Some(3));
    }

    #[test]
    fn no_payback_within_horizon() {
        let r = project(10.0, &cfg(1000.0, 0.0));
        assert_eq!(r.payback_year, None);
        assert!((r.roi_percent + 85.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_inputs_do_not_iterate() {
        let r = project(0.0, &cfg(1000.0, 0.02));
        assert_eq!(r.payback_year, None);
        assert_eq!(r.roi_percent, 0.0);
        assert!(r.yearly_savings.is_empty());

        let r = project(-50.0, &cfg(1000.0, 0.02));
        assert_eq!(r.payback_year, None);

        let r = project(100.0, &cfg(0.0, 0.02));
        assert_eq!(r.roi_percent, 0.0);
    }

    #[test]
    fn invalid_config_rejected() {
        assert!(cfg(-1.0, 0.0).validate().is_err());
        assert!(cfg(100.0, 1.0).validate().is_err());
        let zero_horizon = RoiConfig {
            horizon_years: 0,
            ..RoiConfig::default()
        };
        assert!(zero_horizon.validate().is_err());
        assert!(RoiConfig::default().validate().is_ok());
    }
}
