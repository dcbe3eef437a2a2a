//! Monthly peak shaving for capacity-billed households.
//!
//! The optimizer looks at the grid demand the household would have without a
//! battery, sets a lower target for each month and keeps enough energy in
//! reserve to shave the part of the peak above that target.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::series::TimeSeries;

use super::calendar::Calendar;
use super::dispatch::DispatchSimulator;
use super::power_balance::{direct_balance, net_demand_kw};
use super::types::{SimulationResult, StepFlow};

/// Default share of the baseline peak the optimizer aims for.
pub const DEFAULT_REDUCTION_FACTOR: f64 = 0.85;

/// Tuning of the peak optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeakSettings {
    /// Target peak as a fraction of the baseline peak, in [0, 1].
    pub reduction_factor: f64,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            reduction_factor: DEFAULT_REDUCTION_FACTOR,
        }
    }
}

impl PeakSettings {
    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.reduction_factor) {
            return Err(EngineError::invalid(
                "peak.reduction_factor",
                "must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Highest grid demand (kW) per calendar month of a per-step kWh profile.
///
/// Negative values (export) never count towards a peak. Months without steps
/// report 0.
pub fn monthly_peaks(profile_kwh: &[f64], dt_hours: f64) -> [f64; 12] {
    let cal = Calendar::new(dt_hours);
    let ranges = cal.month_ranges(profile_kwh.len());
    std::array::from_fn(|m| {
        profile_kwh[ranges[m].clone()]
            .iter()
            .map(|&e| e.max(0.0) / dt_hours)
            .fold(0.0, f64::max)
    })
}

/// Monthly peaks of `max(load - pv, 0)`: the demand without a battery.
pub fn baseline_peaks(load: &TimeSeries, pv: &TimeSeries) -> [f64; 12] {
    let cal = Calendar::new(load.dt_hours);
    let ranges = cal.month_ranges(load.len());
    std::array::from_fn(|m| {
        ranges[m]
            .clone()
            .map(|t| net_demand_kw(load.values[t], pv.values[t], load.dt_hours))
            .fold(0.0, f64::max)
    })
}

/// Per-month targets and reserves derived from the baseline peaks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakPlan {
    /// Baseline monthly peaks (kW).
    pub peaks_before: [f64; 12],
    /// Target monthly peaks (kW).
    pub targets: [f64; 12],
    /// Energy kept back per month to shave down to the target (kWh).
    pub reserve_kwh: [f64; 12],
}

impl PeakPlan {
    /// Plans targets as `baseline * reduction_factor` and reserves as the
    /// energy of one step at the shaved demand.
    pub fn from_baseline(peaks_before: [f64; 12], reduction_factor: f64, dt_hours: f64) -> Self {
        let targets = peaks_before.map(|p| p * reduction_factor);
        let reserve_kwh = std::array::from_fn(|m| (peaks_before[m] - targets[m]) * dt_hours);
        Self {
            peaks_before,
            targets,
            reserve_kwh,
        }
    }

    /// Minimum state of charge for ordinary discharge at every step.
    ///
    /// `min(e_min + reserve[month], e_max)`.
    pub fn reserve_curve(&self, len: usize, dt_hours: f64, e_min: f64, e_max: f64) -> Vec<f64> {
        Calendar::new(dt_hours)
            .month_index(len)
            .into_iter()
            .map(|m| (e_min + self.reserve_kwh[m]).min(e_max))
            .collect()
    }
}

/// Outcome of a peak-aware dispatch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakShavingResult {
    pub peaks_before: [f64; 12],
    pub targets: [f64; 12],
    pub reserve_kwh: [f64; 12],
    /// Realized monthly peaks of the grid import (kW).
    pub peaks_after: [f64; 12],
    pub flows: SimulationResult,
}

/// Drives the dispatch loop with a monthly peak target in mind.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeakOptimizer {
    settings: PeakSettings,
}

impl PeakOptimizer {
    pub fn new(settings: PeakSettings) -> EngineResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Plans reserves from the simulator's inputs and runs peak-aware dispatch.
    pub fn run(&self, sim: &DispatchSimulator<'_>) -> PeakShavingResult {
        let plan = PeakPlan::from_baseline(
            baseline_peaks(sim.load(), sim.pv()),
            self.settings.reduction_factor,
            sim.dt_hours(),
        );
        self.run_with_plan(sim, &plan)
    }

    /// Runs peak-aware dispatch against an explicit plan.
    ///
    /// On a deficit step the battery first covers the demand above the
    /// month's target, down to `e_min`. Whatever power is left then serves
    /// ordinary self-consumption without dipping below the reserve curve.
    /// Cheap-hour grid charging, when enabled on the simulator, only fills
    /// the gap between the step's demand and the month's target.
    pub fn run_with_plan(&self, sim: &DispatchSimulator<'_>, plan: &PeakPlan) -> PeakShavingResult {
        let dt = sim.dt_hours();
        let load = sim.load();
        let pv = sim.pv();
        let months = Calendar::new(dt).month_index(load.len());

        let mut storage = sim.storage();
        let budget = storage.battery.step_limit_kwh(dt);
        let e_min = storage.battery.e_min_kwh;
        let min_soc = plan.reserve_curve(load.len(), dt, e_min, storage.battery.e_max_kwh);
        let mut flows = SimulationResult::with_capacity(load.len(), dt);

        for (t, (&l, &p)) in load.values.iter().zip(&pv.values).enumerate() {
            let balance = direct_balance(l, p);
            let mut step = StepFlow::default();

            let target_kwh = plan.targets[months[t]] * dt;
            if balance.surplus_kwh > 0.0 {
                step.charge_kwh = storage.charge(balance.surplus_kwh, budget);
                step.export_kwh = (balance.surplus_kwh - step.charge_kwh).max(0.0);
            } else if sim.cheap_step(t) {
                // grid charging may not push the import above the month's target
                let room = (target_kwh - balance.deficit_kwh).max(0.0);
                step.charge_kwh = storage.charge(room, budget);
                step.import_kwh = balance.deficit_kwh + step.charge_kwh;
            } else if balance.deficit_kwh > 0.0 {
                let excess = (balance.deficit_kwh - target_kwh).max(0.0);
                let shaved = storage.discharge(excess, budget, e_min);

                let remaining = balance.deficit_kwh - shaved;
                let ordinary = storage.discharge(remaining, budget - shaved, min_soc[t]);

                step.discharge_kwh = shaved + ordinary;
                step.import_kwh = (remaining - ordinary).max(0.0);
            }
            step.soc_kwh = storage.soc_kwh;
            flows.push(step);
        }

        let flows = flows.finish();
        let peaks_after = monthly_peaks(&flows.import_profile, dt);
        debug!(
            peak_before_kw = plan.peaks_before.iter().copied().fold(0.0, f64::max),
            peak_after_kw = peaks_after.iter().copied().fold(0.0, f64::max),
            "peak-aware dispatch finished"
        );

        PeakShavingResult {
            peaks_before: plan.peaks_before,
            targets: plan.targets,
            reserve_kwh: plan.reserve_kwh,
            peaks_after,
            flows,
        }
    }
}

/// Arithmetic mean of twelve monthly values.
pub fn mean_of_months(values: &[f64; 12]) -> f64 {
    values.iter().sum::<f64>() / 12.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::battery::{BatteryModel, BatterySpec, InitialSoc};
    use crate::sim::dispatch::GridCharging;

    #[test]
    fn baseline_peak_ignores_export_and_scales_by_interval() {
        let load = TimeSeries::quarter_hourly(vec![1.0, 0.0, 2.0, 0.5]);
        let pv = TimeSeries::quarter_hourly(vec![0.0, 1.0, 0.5, 0.0]);
        let peaks = baseline_peaks(&load, &pv);
        // max(load - pv) = 1.5 kWh in 0.25 h
        assert_eq!(peaks[0], 6.0);
        assert!(peaks[1..].iter().all(|&p| p == 0.0));
    }

    #[test]
    fn plan_targets_and_reserve() {
        let mut before = [0.0; 12];
        before[0] = 10.0;
        before[6] = 4.0;
        let plan = PeakPlan::from_baseline(before, 0.85, 1.0);
        assert!((plan.targets[0] - 8.5).abs() < 1e-12);
        assert!((plan.reserve_kwh[0] - 1.5).abs() < 1e-12);
        assert!((plan.reserve_kwh[6] - 0.6).abs() < 1e-12);
        assert_eq!(plan.reserve_kwh[3], 0.0);
    }

    #[test]
    fn reserve_curve_is_capped_at_e_max() {
        let mut before = [0.0; 12];
        before[0] = 40.0;
        let plan = PeakPlan::from_baseline(before, 0.5, 1.0);
        let curve = plan.reserve_curve(3, 1.0, 1.0, 10.0);
        assert_eq!(curve, vec![10.0; 3]);
    }

    #[test]
    fn shaves_excess_above_target_first() {
        let load = TimeSeries::hourly(vec![10.0]);
        let pv = TimeSeries::hourly(vec![0.0]);
        let battery = BatteryModel::new(
            BatterySpec::new(10.0, 10.0, 1.0, 1.0).with_initial_soc(InitialSoc::Midpoint),
        )
        .unwrap();
        let sim = DispatchSimulator::new(&load, &pv, Some(&battery)).unwrap();

        let mut before = [0.0; 12];
        before[0] = 10.0;
        let plan = PeakPlan::from_baseline(before, 0.6, 1.0);
        let result = PeakOptimizer::default().run_with_plan(&sim, &plan);

        // 4 kWh shaved above the 6 kW target, the remaining 1 kWh is held back
        // by the 4 kWh reserve floor.
        assert!((result.flows.import_profile[0] - 6.0).abs() < 1e-9);
        assert!((result.peaks_after[0] - 6.0).abs() < 1e-9);
        assert!((result.flows.soc_profile[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn grid_charging_stays_below_monthly_target() {
        let load = TimeSeries::hourly(vec![1.0, 1.0, 6.0, 6.0]);
        let pv = TimeSeries::hourly(vec![0.0; 4]);
        let battery = BatteryModel::new(BatterySpec::new(10.0, 5.0, 1.0, 1.0)).unwrap();
        let cheap = GridCharging::new(&[0.05, 0.05, 0.50, 0.50]).unwrap();
        let sim = DispatchSimulator::new(&load, &pv, Some(&battery))
            .unwrap()
            .with_grid_charging(cheap);

        let mut before = [0.0; 12];
        before[0] = 6.0;
        let plan = PeakPlan::from_baseline(before, 0.5, 1.0);
        let result = PeakOptimizer::default().run_with_plan(&sim, &plan);

        // 2 kWh charged on each cheap hour, topping the import up to the 3 kW target
        assert_eq!(result.flows.charge_profile[..2], [2.0, 2.0]);
        assert_eq!(result.flows.import_profile, vec![3.0, 3.0, 3.0, 5.0]);
        assert!(result.peaks_after[0] <= result.peaks_before[0]);
    }

    #[test]
    fn realized_peak_never_exceeds_baseline() {
        let load = TimeSeries::hourly((0..96).map(|t| 1.0 + (t % 7) as f64).collect());
        let pv = TimeSeries::hourly(
            (0..96)
                .map(|t| if t % 24 == 12 { 6.0 } else { 0.0 })
                .collect(),
        );
        let battery = BatteryModel::new(BatterySpec::new(5.0, 2.0, 0.9, 0.9)).unwrap();
        let sim = DispatchSimulator::new(&load, &pv, Some(&battery)).unwrap();
        let result = PeakOptimizer::default().run(&sim);
        for m in 0..12 {
            assert!(result.peaks_after[m] <= result.peaks_before[m] + 1e-9);
        }
    }

    #[test]
    fn without_battery_peaks_are_unchanged() {
        let load = TimeSeries::hourly(vec![3.0, 5.0, 1.0]);
        let pv = TimeSeries::hourly(vec![0.0, 1.0, 2.0]);
        let sim = DispatchSimulator::new(&load, &pv, None).unwrap();
        let result = PeakOptimizer::default().run(&sim);
        assert_eq!(result.peaks_after, result.peaks_before);
        assert_eq!(result.flows.import_profile, vec![3.0, 4.0, 0.0]);
    }

    #[test]
    fn reduction_factor_outside_unit_interval_rejected() {
        let err = PeakOptimizer::new(PeakSettings {
            reduction_factor: 1.5,
        })
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfiguration {
                field: "peak.reduction_factor",
                ..
            }
        ));
    }

    #[test]
    fn mean_of_months_divides_by_twelve() {
        let mut v = [0.0; 12];
        v[0] = 12.0;
        assert_eq!(mean_of_months(&v), 1.0);
    }
}
