//! Household power balance before any storage is involved.

/// Split of one step's load and PV after direct self-consumption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectBalance {
    /// PV consumed on site in the same step (kWh).
    pub direct_kwh: f64,
    /// Load not covered by PV (kWh, >= 0).
    pub deficit_kwh: f64,
    /// PV not consumed by the load (kWh, >= 0).
    pub surplus_kwh: f64,
}

/// Matches PV against load within one step.
///
/// At most one of `deficit_kwh` and `surplus_kwh` is non-zero, and
/// `deficit - surplus == load - pv` holds exactly.
///
/// # Arguments
///
/// * `load_kwh` - Household consumption this step
/// * `pv_kwh` - Solar production this step
pub fn direct_balance(load_kwh: f64, pv_kwh: f64) -> DirectBalance {
    if load_kwh >= pv_kwh {
        DirectBalance {
            direct_kwh: pv_kwh,
            deficit_kwh: load_kwh - pv_kwh,
            surplus_kwh: 0.0,
        }
    } else {
        DirectBalance {
            direct_kwh: load_kwh,
            deficit_kwh: 0.0,
            surplus_kwh: pv_kwh - load_kwh,
        }
    }
}

/// Grid-side net demand in kW for a step (positive = import, never negative).
pub fn net_demand_kw(load_kwh: f64, pv_kwh: f64, dt_hours: f64) -> f64 {
    (load_kwh - pv_kwh).max(0.0) / dt_hours
}
