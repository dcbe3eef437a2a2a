//! Core simulation output types: per-step flows and their annual totals.

use std::fmt;

use serde::Serialize;

/// Energy flows of one completed dispatch run.
///
/// All profiles have one entry per step and are expressed in kWh per step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    /// Total grid import (kWh).
    pub import_kwh: f64,
    /// Total grid export (kWh).
    pub export_kwh: f64,
    pub import_profile: Vec<f64>,
    pub export_profile: Vec<f64>,
    /// State of charge after each step (kWh).
    pub soc_profile: Vec<f64>,
    /// Energy drawn from PV into the battery per step, before charge losses.
    pub charge_profile: Vec<f64>,
    /// Energy delivered from the battery to the load per step, after losses.
    pub discharge_profile: Vec<f64>,
    /// Interval duration in hours.
    pub dt_hours: f64,
}

impl SimulationResult {
    pub(crate) fn with_capacity(n: usize, dt_hours: f64) -> Self {
        Self {
            import_kwh: 0.0,
            export_kwh: 0.0,
            import_profile: Vec::with_capacity(n),
            export_profile: Vec::with_capacity(n),
            soc_profile: Vec::with_capacity(n),
            charge_profile: Vec::with_capacity(n),
            discharge_profile: Vec::with_capacity(n),
            dt_hours,
        }
    }

    pub(crate) fn push(&mut self, step: StepFlow) {
        self.import_profile.push(step.import_kwh);
        self.export_profile.push(step.export_kwh);
        self.soc_profile.push(step.soc_kwh);
        self.charge_profile.push(step.charge_kwh);
        self.discharge_profile.push(step.discharge_kwh);
    }

    /// Recomputes the annual totals from the profiles.
    pub(crate) fn finish(mut self) -> Self {
        self.import_kwh = self.import_profile.iter().sum();
        self.export_kwh = self.export_profile.iter().sum();
        self
    }

    pub fn len(&self) -> usize {
        self.import_profile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.import_profile.is_empty()
    }

    /// Per-step record for export and the API, joined with the input series.
    pub fn step_record(&self, t: usize, load_kwh: f64, pv_kwh: f64) -> StepRecord {
        StepRecord {
            step: t,
            hour: t as f64 * self.dt_hours,
            load_kwh,
            pv_kwh,
            import_kwh: self.import_profile[t],
            export_kwh: self.export_profile[t],
            soc_kwh: self.soc_profile[t],
        }
    }

    /// All step records for the given input series.
    ///
    /// Stops at the shortest of the three sequences.
    pub fn step_records(&self, load: &[f64], pv: &[f64]) -> Vec<StepRecord> {
        load.iter()
            .zip(pv)
            .take(self.len())
            .enumerate()
            .map(|(t, (&l, &p))| self.step_record(t, l, p))
            .collect()
    }
}

/// Flows of a single step, produced by the dispatch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepFlow {
    pub import_kwh: f64,
    pub export_kwh: f64,
    pub soc_kwh: f64,
    pub charge_kwh: f64,
    pub discharge_kwh: f64,
}

/// Complete record of one simulated step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// Step index.
    pub step: usize,
    /// Hours since the start of the series.
    pub hour: f64,
    pub load_kwh: f64,
    pub pv_kwh: f64,
    pub import_kwh: f64,
    pub export_kwh: f64,
    /// Battery state of charge after this step (kWh).
    pub soc_kwh: f64,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>5} ({:>7.2}h) | load={:.3}  pv={:.3} | import={:.3}  export={:.3} | \
             SoC={:.3} kWh",
            self.step,
            self.hour,
            self.load_kwh,
            self.pv_kwh,
            self.import_kwh,
            self.export_kwh,
            self.soc_kwh,
        )
    }
}
