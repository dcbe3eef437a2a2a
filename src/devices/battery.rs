use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Where the state of charge starts at step 0.
///
/// Positions are relative to the usable range `[e_min, e_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialSoc {
    /// Start empty, at the depth-of-discharge floor.
    #[default]
    Minimum,
    /// Start halfway through the usable range.
    Midpoint,
    /// Start at a fraction (0.0 to 1.0) of the usable range above the floor.
    Fraction(f64),
}

/// Raw battery parameters as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatterySpec {
    /// Nominal capacity in kWh.
    pub capacity_kwh: f64,
    /// Maximum charge and discharge power in kW.
    pub power_kw: f64,
    /// Depth of discharge (0.0 to 1.0].
    pub dod: f64,
    /// Round-trip efficiency (0.0 to 1.0].
    pub round_trip_efficiency: f64,
    /// Starting state of charge.
    pub initial_soc: InitialSoc,
}

impl BatterySpec {
    pub fn new(capacity_kwh: f64, power_kw: f64, dod: f64, round_trip_efficiency: f64) -> Self {
        Self {
            capacity_kwh,
            power_kw,
            dod,
            round_trip_efficiency,
            initial_soc: InitialSoc::default(),
        }
    }

    pub fn with_initial_soc(mut self, initial_soc: InitialSoc) -> Self {
        self.initial_soc = initial_soc;
        self
    }
}

/// Validated battery with its derived physical bounds.
///
/// The round-trip efficiency is split symmetrically: charge and discharge
/// efficiency are both `sqrt(round_trip)`. Charging loses energy on the way
/// into storage, discharging on the way out; each loss applies once.
///
/// # Examples
///
/// ```
/// use battery_roi::devices::battery::{BatteryModel, BatterySpec};
///
/// let battery = BatteryModel::new(BatterySpec::new(10.0, 5.0, 0.9, 0.81)).unwrap();
/// assert!((battery.e_min_kwh - 1.0).abs() < 1e-12);
/// assert_eq!(battery.e_max_kwh, 10.0);
/// assert!((battery.eta_charge - 0.9).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryModel {
    /// Nominal capacity in kWh.
    pub capacity_kwh: f64,
    /// Maximum charge/discharge power in kW.
    pub power_kw: f64,
    /// Lowest allowed state of charge in kWh.
    pub e_min_kwh: f64,
    /// Highest allowed state of charge in kWh.
    pub e_max_kwh: f64,
    pub eta_charge: f64,
    pub eta_discharge: f64,
    /// State of charge at step 0 in kWh.
    pub initial_soc_kwh: f64,
}

impl BatteryModel {
    /// Validates `spec` and derives the operating bounds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfiguration`] if capacity or power is
    /// not positive, if depth of discharge or efficiency is outside (0, 1],
    /// or if an initial fraction is outside [0, 1].
    pub fn new(spec: BatterySpec) -> EngineResult<Self> {
        if !(spec.capacity_kwh.is_finite() && spec.capacity_kwh > 0.0) {
            return Err(EngineError::invalid("battery.capacity_kwh", "must be > 0"));
        }
        if !(spec.power_kw.is_finite() && spec.power_kw > 0.0) {
            return Err(EngineError::invalid("battery.power_kw", "must be > 0"));
        }
        if !(spec.dod > 0.0 && spec.dod <= 1.0) {
            return Err(EngineError::invalid("battery.dod", "must be in (0, 1]"));
        }
        if !(spec.round_trip_efficiency > 0.0 && spec.round_trip_efficiency <= 1.0) {
            return Err(EngineError::invalid(
                "battery.round_trip_efficiency",
                "must be in (0, 1]",
            ));
        }

        let e_min = spec.capacity_kwh * (1.0 - spec.dod);
        let e_max = spec.capacity_kwh;
        let usable = e_max - e_min;

        let fraction = match spec.initial_soc {
            InitialSoc::Minimum => 0.0,
            InitialSoc::Midpoint => 0.5,
            InitialSoc::Fraction(f) => {
                if !(0.0..=1.0).contains(&f) {
                    return Err(EngineError::invalid(
                        "battery.initial_soc",
                        "fraction must be in [0, 1]",
                    ));
                }
                f
            }
        };

        let eta = spec.round_trip_efficiency.sqrt();

        Ok(Self {
            capacity_kwh: spec.capacity_kwh,
            power_kw: spec.power_kw,
            e_min_kwh: e_min,
            e_max_kwh: e_max,
            eta_charge: eta,
            eta_discharge: eta,
            initial_soc_kwh: e_min + fraction * usable,
        })
    }

    /// Zero-capacity, zero-power storage standing in for "no battery".
    ///
    /// Efficiencies are 1.0 so the dispatch loop never divides by zero.
    pub fn none() -> Self {
        Self {
            capacity_kwh: 0.0,
            power_kw: 0.0,
            e_min_kwh: 0.0,
            e_max_kwh: 0.0,
            eta_charge: 1.0,
            eta_discharge: 1.0,
            initial_soc_kwh: 0.0,
        }
    }

    /// Energy between the floor and the ceiling in kWh.
    pub fn usable_kwh(&self) -> f64 {
        self.e_max_kwh - self.e_min_kwh
    }

    /// Energy that can move through the terminals in one step of `dt_hours`.
    pub fn step_limit_kwh(&self, dt_hours: f64) -> f64 {
        self.power_kw * dt_hours
    }
}
