//! Self-consumption dispatch: PV to load, surplus to battery, deficit from battery.

use tracing::debug;

use crate::devices::battery::BatteryModel;
use crate::error::EngineResult;
use crate::series::{TimeSeries, check_aligned};
use crate::tariff::prices::price_at;

use super::power_balance::direct_balance;
use super::types::{SimulationResult, StepFlow};

/// Battery state carried from one step to the next.
///
/// Every mutation clamps the state of charge back into
/// `[e_min_kwh, e_max_kwh]`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Storage {
    pub battery: BatteryModel,
    pub soc_kwh: f64,
}

impl Storage {
    pub fn new(battery: BatteryModel) -> Self {
        Self {
            soc_kwh: battery.initial_soc_kwh,
            battery,
        }
    }

    /// Stores up to `offered_kwh` of surplus within `budget_kwh` of terminal energy.
    ///
    /// Returns the energy taken from the surplus (before charge losses).
    pub fn charge(&mut self, offered_kwh: f64, budget_kwh: f64) -> f64 {
        let b = &self.battery;
        let headroom = (b.e_max_kwh - self.soc_kwh).max(0.0) / b.eta_charge;
        let taken = offered_kwh.min(budget_kwh).min(headroom).max(0.0);
        self.soc_kwh += taken * b.eta_charge;
        self.clamp();
        taken
    }

    /// Delivers up to `wanted_kwh` to the load without going below `floor_kwh`.
    ///
    /// Returns the energy delivered (after discharge losses).
    pub fn discharge(&mut self, wanted_kwh: f64, budget_kwh: f64, floor_kwh: f64) -> f64 {
        let b = &self.battery;
        let available = (self.soc_kwh - floor_kwh.max(b.e_min_kwh)).max(0.0) * b.eta_discharge;
        let delivered = wanted_kwh.min(budget_kwh).min(available).max(0.0);
        self.soc_kwh -= delivered / b.eta_discharge;
        self.clamp();
        delivered
    }

    fn clamp(&mut self) {
        self.soc_kwh = self
            .soc_kwh
            .clamp(self.battery.e_min_kwh, self.battery.e_max_kwh);
    }
}

/// Quantile of the price series at or below which grid charging is allowed.
pub const CHEAP_PRICE_QUANTILE: f64 = 0.25;

/// Cheap-hour grid charging under a dynamic price series.
///
/// On a step without PV surplus whose price is at or below the lower
/// quartile of the series, the battery charges from the grid at full power
/// instead of discharging; the load of that step is imported as well.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCharging {
    prices: Vec<f64>,
    threshold: f64,
}

impl GridCharging {
    /// Builds the rule from a per-step price series. Returns `None` for an
    /// empty series.
    pub fn new(prices: &[f64]) -> Option<Self> {
        let mut sorted = prices.to_vec();
        sorted.sort_by(f64::total_cmp);
        let idx = (CHEAP_PRICE_QUANTILE * sorted.len() as f64) as usize;
        let threshold = *sorted.get(idx).or(sorted.last())?;
        Some(Self {
            prices: prices.to_vec(),
            threshold,
        })
    }

    /// Highest price still counted as cheap.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub(crate) fn is_cheap(&self, t: usize) -> bool {
        price_at(&self.prices, t) <= self.threshold
    }
}

/// Runs the causal self-consumption loop over a load/PV pair.
///
/// A missing battery is simulated as zero-capacity storage, which reduces the
/// loop to `import = max(load - pv, 0)` and `export = max(pv - load, 0)`.
///
/// # Examples
///
/// ```
/// use battery_roi::devices::battery::{BatteryModel, BatterySpec};
/// use battery_roi::series::TimeSeries;
/// use battery_roi::sim::dispatch::DispatchSimulator;
///
/// let load = TimeSeries::hourly(vec![0.0, 5.0]);
/// let pv = TimeSeries::hourly(vec![5.0, 0.0]);
/// let battery = BatteryModel::new(BatterySpec::new(10.0, 5.0, 0.9, 0.9)).unwrap();
///
/// let result = DispatchSimulator::new(&load, &pv, Some(&battery)).unwrap().run();
/// assert!((result.import_profile[1] - 0.5).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct DispatchSimulator<'a> {
    load: &'a TimeSeries,
    pv: &'a TimeSeries,
    battery: Option<BatteryModel>,
    grid_charging: Option<GridCharging>,
}

impl<'a> DispatchSimulator<'a> {
    /// Creates a simulator after checking the series line up.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EngineError::LengthMismatch`] for empty or
    /// unequal series, [`crate::error::EngineError::InvalidInterval`] for a
    /// bad or inconsistent interval.
    pub fn new(
        load: &'a TimeSeries,
        pv: &'a TimeSeries,
        battery: Option<&BatteryModel>,
    ) -> EngineResult<Self> {
        check_aligned(load, pv)?;
        Ok(Self {
            load,
            pv,
            battery: battery.copied(),
            grid_charging: None,
        })
    }

    /// Enables cheap-hour grid charging for this simulator.
    pub fn with_grid_charging(mut self, grid_charging: GridCharging) -> Self {
        self.grid_charging = Some(grid_charging);
        self
    }

    pub fn dt_hours(&self) -> f64 {
        self.load.dt_hours
    }

    /// Storage used by this simulator (zero-capacity without a battery).
    pub(crate) fn storage(&self) -> Storage {
        Storage::new(self.battery.unwrap_or_else(BatteryModel::none))
    }

    /// Executes every step and returns the flow profiles.
    pub fn run(&self) -> SimulationResult {
        let dt = self.dt_hours();
        let mut storage = self.storage();
        let budget = storage.battery.step_limit_kwh(dt);
        let floor = storage.battery.e_min_kwh;
        let mut result = SimulationResult::with_capacity(self.load.len(), dt);

        for (t, (&load, &pv)) in self.load.values.iter().zip(&self.pv.values).enumerate() {
            let balance = direct_balance(load, pv);
            let mut step = StepFlow::default();

            if balance.surplus_kwh > 0.0 {
                step.charge_kwh = storage.charge(balance.surplus_kwh, budget);
                step.export_kwh = (balance.surplus_kwh - step.charge_kwh).max(0.0);
            } else if self.cheap_step(t) {
                step.charge_kwh = storage.charge(budget, budget);
                step.import_kwh = balance.deficit_kwh + step.charge_kwh;
            } else if balance.deficit_kwh > 0.0 {
                step.discharge_kwh = storage.discharge(balance.deficit_kwh, budget, floor);
                step.import_kwh = (balance.deficit_kwh - step.discharge_kwh).max(0.0);
            }
            step.soc_kwh = storage.soc_kwh;
            result.push(step);
        }

        let result = result.finish();
        debug!(
            steps = result.len(),
            battery = self.battery.is_some(),
            grid_charging = self.grid_charging.is_some(),
            import_kwh = result.import_kwh,
            export_kwh = result.export_kwh,
            "dispatch finished"
        );
        result
    }

    pub(crate) fn load(&self) -> &TimeSeries {
        self.load
    }

    pub(crate) fn pv(&self) -> &TimeSeries {
        self.pv
    }

    /// Whether step `t` charges from the grid instead of discharging.
    pub(crate) fn cheap_step(&self, t: usize) -> bool {
        self.battery.is_some() && self.grid_charging.as_ref().is_some_and(|g| g.is_cheap(t))
    }
}
