//! Post-hoc energy indicators from dispatch results.

use std::fmt;

use serde::Serialize;

use super::types::SimulationResult;

/// Household energy indicators derived from one dispatch run.
///
/// Computed post-hoc from the flow profiles so the reported figures always
/// agree with the step data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowKpis {
    /// Total load (kWh).
    pub load_kwh: f64,
    /// Total PV production (kWh).
    pub pv_kwh: f64,
    /// Share of PV used on site, directly or via the battery (0..1).
    pub self_consumption: f64,
    /// Share of load not drawn from the grid (0..1).
    pub self_sufficiency: f64,
    /// Energy delivered by the battery (kWh).
    pub battery_throughput_kwh: f64,
    /// Throughput divided by the usable capacity.
    pub equivalent_full_cycles: f64,
}

impl FlowKpis {
    /// Computes all indicators.
    ///
    /// # Arguments
    ///
    /// * `result` - Completed dispatch run
    /// * `load_kwh` - Total load over the same period
    /// * `pv_kwh` - Total PV production over the same period
    /// * `usable_kwh` - Usable battery capacity for the cycle count
    pub fn from_result(
        result: &SimulationResult,
        load_kwh: f64,
        pv_kwh: f64,
        usable_kwh: f64,
    ) -> Self {
        let self_consumption = if pv_kwh > 0.0 {
            ((pv_kwh - result.export_kwh) / pv_kwh).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let self_sufficiency = if load_kwh > 0.0 {
            ((load_kwh - result.import_kwh) / load_kwh).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let throughput: f64 = result.discharge_profile.iter().sum();
        let cycles = if usable_kwh > 0.0 {
            throughput / usable_kwh
        } else {
            0.0
        };

        Self {
            load_kwh,
            pv_kwh,
            self_consumption,
            self_sufficiency,
            battery_throughput_kwh: throughput,
            equivalent_full_cycles: cycles,
        }
    }
}

impl fmt::Display for FlowKpis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Load:                  {:.1} kWh", self.load_kwh)?;
        writeln!(f, "PV production:         {:.1} kWh", self.pv_kwh)?;
        writeln!(f, "Self-consumption:      {:.1}%", self.self_consumption * 100.0)?;
        writeln!(f, "Self-sufficiency:      {:.1}%", self.self_sufficiency * 100.0)?;
        write!(
            f,
            "Battery throughput:    {:.1} kWh ({:.1} equiv. cycles)",
            self.battery_throughput_kwh, self.equivalent_full_cycles
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::StepFlow;

    fn result(steps: &[(f64, f64, f64)]) -> SimulationResult {
        let mut r = SimulationResult::with_capacity(steps.len(), 1.0);
        for &(import_kwh, export_kwh, discharge_kwh) in steps {
            r.push(StepFlow {
                import_kwh,
                export_kwh,
                discharge_kwh,
                ..StepFlow::default()
            });
        }
        r.finish()
    }

    #[test]
    fn ratios_from_totals() {
        // load 10, pv 8, import 4, export 2
        let r = result(&[(4.0, 0.0, 1.0), (0.0, 2.0, 0.0)]);
        let kpi = FlowKpis::from_result(&r, 10.0, 8.0, 5.0);
        assert!((kpi.self_consumption - 0.75).abs() < 1e-12);
        assert!((kpi.self_sufficiency - 0.6).abs() < 1e-12);
        assert_eq!(kpi.battery_throughput_kwh, 1.0);
        assert!((kpi.equivalent_full_cycles - 0.2).abs() < 1e-12);
    }

    #[test]
    fn zero_totals_do_not_divide() {
        let r = result(&[(0.0, 0.0, 0.0)]);
        let kpi = FlowKpis::from_result(&r, 0.0, 0.0, 0.0);
        assert_eq!(kpi.self_consumption, 0.0);
        assert_eq!(kpi.self_sufficiency, 0.0);
        assert_eq!(kpi.equivalent_full_cycles, 0.0);
    }

    #[test]
    fn display_does_not_panic() {
        let r = result(&[(1.0, 0.0, 0.0)]);
        assert!(!format!("{}", FlowKpis::from_result(&r, 1.0, 0.0, 0.0)).is_empty());
    }
}
