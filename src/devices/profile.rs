//! Synthetic one-year load and PV profiles for households without metered data.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::series::{TimeSeries, steps_per_day, validate_interval};
use crate::sim::calendar::DAYS_PER_MONTH;

/// Relative load per month, heavier in winter.
const MONTH_LOAD_FACTORS: [f64; 12] = [
    1.10, 1.08, 1.02, 0.98, 0.95, 0.92, 0.90, 0.90, 0.94, 1.00, 1.05, 1.06,
];

/// Relative PV yield per month, heavier in summer.
const MONTH_PV_FACTORS: [f64; 12] = [
    0.35, 0.45, 0.75, 1.05, 1.25, 1.35, 1.35, 1.20, 0.95, 0.65, 0.40, 0.30,
];

/// Daily consumption pattern of a household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdKind {
    /// Flat day with a pronounced evening peak.
    SingleWorker,
    /// Morning and evening peaks.
    #[default]
    Family,
    /// More consumption during office hours.
    HomeWorker,
}

impl HouseholdKind {
    fn hourly_shape(&self) -> [f64; 24] {
        match self {
            Self::SingleWorker => [
                0.020, 0.015, 0.012, 0.012, 0.014, 0.020, 0.030, 0.035, 0.030, 0.025, 0.025,
                0.030, 0.035, 0.035, 0.030, 0.030, 0.035, 0.050, 0.070, 0.080, 0.075, 0.055,
                0.035, 0.025,
            ],
            Self::Family => [
                0.020, 0.015, 0.012, 0.012, 0.015, 0.030, 0.050, 0.045, 0.035, 0.030, 0.028,
                0.030, 0.032, 0.032, 0.030, 0.032, 0.040, 0.060, 0.075, 0.080, 0.070, 0.050,
                0.032, 0.022,
            ],
            Self::HomeWorker => [
                0.022, 0.016, 0.013, 0.013, 0.016, 0.028, 0.040, 0.040, 0.038, 0.038, 0.040,
                0.045, 0.045, 0.045, 0.040, 0.038, 0.040, 0.050, 0.060, 0.060, 0.055, 0.040,
                0.030, 0.024,
            ],
        }
    }
}

/// Parameters of a synthetic household year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileSpec {
    /// Yearly consumption (kWh).
    pub annual_load_kwh: f64,
    /// Yearly PV production (kWh).
    pub annual_pv_kwh: f64,
    pub household: HouseholdKind,
    /// Heat pump: heavier mornings, evenings and winter months.
    pub heat_pump: bool,
    /// Electric vehicle: heavier evenings and early night.
    pub ev: bool,
    /// Interval duration in hours.
    pub dt_hours: f64,
    /// Relative standard deviation of per-step noise (0 disables noise).
    pub noise_std: f64,
    pub seed: u64,
}

impl Default for ProfileSpec {
    fn default() -> Self {
        Self {
            annual_load_kwh: 3500.0,
            annual_pv_kwh: 3000.0,
            household: HouseholdKind::Family,
            heat_pump: false,
            ev: false,
            dt_hours: 1.0,
            noise_std: 0.0,
            seed: 42,
        }
    }
}

/// Builds full-year (365 day) profiles from a [`ProfileSpec`].
///
/// Both series sum exactly to their annual totals, with or without noise.
///
/// # Examples
///
/// ```
/// use battery_roi::devices::profile::{ProfileGenerator, ProfileSpec};
///
/// let mut generator = ProfileGenerator::new(ProfileSpec::default()).unwrap();
/// let load = generator.load_profile();
/// assert_eq!(load.len(), 8760);
/// assert!((load.total() - 3500.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct ProfileGenerator {
    spec: ProfileSpec,
    rng: StdRng,
}

impl ProfileGenerator {
    pub fn new(spec: ProfileSpec) -> EngineResult<Self> {
        validate_interval(spec.dt_hours)?;
        if !(spec.annual_load_kwh.is_finite() && spec.annual_load_kwh >= 0.0) {
            return Err(EngineError::invalid("profile.annual_load_kwh", "must be >= 0"));
        }
        if !(spec.annual_pv_kwh.is_finite() && spec.annual_pv_kwh >= 0.0) {
            return Err(EngineError::invalid("profile.annual_pv_kwh", "must be >= 0"));
        }
        if !(spec.noise_std.is_finite() && spec.noise_std >= 0.0) {
            return Err(EngineError::invalid("profile.noise_std", "must be >= 0"));
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(spec.seed),
            spec,
        })
    }

    /// Household consumption per step (kWh).
    pub fn load_profile(&mut self) -> TimeSeries {
        let mut hour_shape = self.spec.household.hourly_shape();
        let mut month_factors = MONTH_LOAD_FACTORS;

        if self.spec.heat_pump {
            hour_shape[6..9].iter_mut().for_each(|v| *v *= 1.10);
            hour_shape[17..22].iter_mut().for_each(|v| *v *= 1.12);
            for m in [0, 1, 10, 11] {
                month_factors[m] *= 1.10;
            }
        }
        if self.spec.ev {
            hour_shape[18..24].iter_mut().for_each(|v| *v *= 1.12);
            hour_shape[0..2].iter_mut().for_each(|v| *v *= 1.08);
        }

        let values = self.build(self.spec.annual_load_kwh, &hour_shape, &month_factors);
        TimeSeries::new(values, self.spec.dt_hours)
    }

    /// PV production per step (kWh): a bell curve around 13:00, zero at night.
    pub fn pv_profile(&mut self) -> TimeSeries {
        let hour_shape: [f64; 24] = std::array::from_fn(|h| {
            if !(6..=20).contains(&h) {
                return 0.0;
            }
            let x = (h as f64 - 13.0) / 4.2;
            (-0.5 * x * x).exp()
        });
        let values = self.build(self.spec.annual_pv_kwh, &hour_shape, &MONTH_PV_FACTORS);
        TimeSeries::new(values, self.spec.dt_hours)
    }

    fn build(
        &mut self,
        annual_kwh: f64,
        hour_shape: &[f64; 24],
        month_factors: &[f64; 12],
    ) -> Vec<f64> {
        let dt = self.spec.dt_hours;
        let per_day = steps_per_day(dt);
        let hour_shape = normalize(hour_shape);
        let month_factors = normalize(month_factors);
        let day_shares: Vec<f64> = (0..per_day).map(|t| step_share(&hour_shape, t, dt)).collect();

        let mut values = Vec::with_capacity(365 * per_day);
        for (m, &days) in DAYS_PER_MONTH.iter().enumerate() {
            let day_kwh = annual_kwh * month_factors[m] / days as f64;
            for _ in 0..days {
                values.extend(day_shares.iter().map(|s| day_kwh * s));
            }
        }

        if self.spec.noise_std > 0.0 {
            for v in values.iter_mut() {
                *v *= (1.0 + gaussian_noise(&mut self.rng, self.spec.noise_std)).max(0.0);
            }
            let total: f64 = values.iter().sum();
            if total > 0.0 {
                let scale = annual_kwh / total;
                values.iter_mut().for_each(|v| *v *= scale);
            }
        }
        values
    }
}

/// Scales `values` to sum to 1.0. All-zero input is returned unchanged.
fn normalize<const N: usize>(values: &[f64; N]) -> [f64; N] {
    let sum: f64 = values.iter().sum();
    if sum <= 0.0 {
        return *values;
    }
    values.map(|v| v / sum)
}

/// Share of the daily total falling in step `t` of length `dt` hours.
///
/// Integrates the hourly shape over `[t*dt, (t+1)*dt)`.
fn step_share(hour_shape: &[f64; 24], t: usize, dt: f64) -> f64 {
    let start = t as f64 * dt;
    let end = start + dt;
    let mut share = 0.0;
    let mut h = start.floor();
    while h < end {
        let overlap = end.min(h + 1.0) - start.max(h);
        if overlap > 0.0 {
            share += hour_shape[(h as usize) % 24] * overlap;
        }
        h += 1.0;
    }
    share
}

/// Zero-mean Gaussian sample via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos() * std_dev
}
