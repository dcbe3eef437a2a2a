//! Runs the three canonical scenarios and assembles the result bundle.
//!
//! * **A1**: the current contract with net metering and no battery.
//! * **B1**: every tariff without net metering and without a battery.
//! * **C1**: every tariff without net metering and with the battery.
//!
//! The saving of the battery is `B1 - C1` under the current tariff. With
//! grid charging enabled, C1 under the dynamic tariff is dispatched
//! separately with cheap-hour charging.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::cost::{CostEngine, PeakPair, ScenarioResult};
use crate::devices::battery::{BatteryModel, BatterySpec};
use crate::error::EngineResult;
use crate::roi::{RoiConfig, RoiResult, project};
use crate::series::TimeSeries;
use crate::sim::dispatch::{DispatchSimulator, GridCharging};
use crate::sim::kpi::FlowKpis;
use crate::sim::peak::{PeakOptimizer, PeakSettings, mean_of_months};
use crate::sim::types::SimulationResult;
use crate::tariff::prices::{PriceProvider, PriceSource, ReferenceDayProvider, resolve_prices};
use crate::tariff::{Jurisdiction, TariffConfig, TariffVariant};

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub load: TimeSeries,
    pub pv: TimeSeries,
    /// Measured dynamic import prices, one per step.
    pub dynamic_prices: Option<Vec<f64>>,
    /// `None` evaluates the household without a battery.
    pub battery: Option<BatterySpec>,
    /// Charge the battery from the grid in cheap hours under the dynamic
    /// tariff (C1 only).
    pub allow_grid_charge: bool,
    pub tariff: TariffConfig,
    pub current_tariff: TariffVariant,
    pub jurisdiction: Jurisdiction,
    pub roi: RoiConfig,
    pub peak: PeakSettings,
}

impl RunInputs {
    /// Inputs with default tariff, ROI and peak settings.
    pub fn new(load: TimeSeries, pv: TimeSeries) -> Self {
        Self {
            load,
            pv,
            dynamic_prices: None,
            battery: None,
            allow_grid_charge: false,
            tariff: TariffConfig::default(),
            current_tariff: TariffVariant::Flat,
            jurisdiction: Jurisdiction::FlatFee,
            roi: RoiConfig::default(),
            peak: PeakSettings::default(),
        }
    }
}

/// Complete outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioBundle {
    pub jurisdiction: Jurisdiction,
    pub current_tariff: TariffVariant,
    pub a1: ScenarioResult,
    pub b1: BTreeMap<TariffVariant, ScenarioResult>,
    pub c1: BTreeMap<TariffVariant, ScenarioResult>,
    /// Yearly saving under the current tariff (`B1 - C1`).
    pub saving: f64,
    pub roi: RoiResult,
    /// Monthly peaks without the battery (kW). Zero in the flat-fee jurisdiction.
    pub monthly_peaks_before: [f64; 12],
    /// Monthly peaks with the battery (kW). Zero in the flat-fee jurisdiction.
    pub monthly_peaks_after: [f64; 12],
    pub flows_without_battery: SimulationResult,
    pub flows_with_battery: SimulationResult,
    /// Flows behind C1 under the dynamic tariff when grid charging is enabled.
    pub flows_with_grid_charging: Option<SimulationResult>,
    pub kpis_without_battery: FlowKpis,
    pub kpis_with_battery: FlowKpis,
    pub price_source: PriceSource,
}

impl ScenarioBundle {
    /// B1 result under the current tariff.
    pub fn b1_current(&self) -> Option<&ScenarioResult> {
        self.b1.get(&self.current_tariff)
    }

    /// C1 result under the current tariff.
    pub fn c1_current(&self) -> Option<&ScenarioResult> {
        self.c1.get(&self.current_tariff)
    }
}

/// Composes dispatch, peak shaving, costing and ROI into one bundle.
///
/// Holds the price provider used when no measured dynamic prices are given.
#[derive(Debug)]
pub struct ScenarioOrchestrator {
    provider: Option<Box<dyn PriceProvider>>,
}

impl Default for ScenarioOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioOrchestrator {
    /// Orchestrator falling back to the reference-day price curve.
    pub fn new() -> Self {
        Self::with_provider(Box::new(ReferenceDayProvider))
    }

    pub fn with_provider(provider: Box<dyn PriceProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Orchestrator that requires measured dynamic prices.
    pub fn without_provider() -> Self {
        Self { provider: None }
    }

    /// Runs all scenarios.
    ///
    /// Every input is validated before the first step is simulated; any
    /// failure aborts the whole bundle.
    pub fn run(&self, inputs: &RunInputs) -> EngineResult<ScenarioBundle> {
        inputs.tariff.validate()?;
        inputs.roi.validate()?;
        let optimizer = PeakOptimizer::new(inputs.peak)?;
        let battery = inputs.battery.map(BatteryModel::new).transpose()?;

        let without = DispatchSimulator::new(&inputs.load, &inputs.pv, None)?;
        let with = DispatchSimulator::new(&inputs.load, &inputs.pv, battery.as_ref())?;
        let steps = inputs.load.len();
        let dt = inputs.load.dt_hours;

        let (prices, price_source) = resolve_prices(
            inputs.dynamic_prices.as_deref(),
            self.provider.as_deref(),
            steps,
            dt,
            inputs.tariff.flat_import,
        )?;

        info!(
            steps,
            dt_hours = dt,
            battery = battery.is_some(),
            jurisdiction = %inputs.jurisdiction,
            current_tariff = %inputs.current_tariff,
            ?price_source,
            "running scenarios"
        );

        let flows_without = without.run();
        let peak_billed = inputs.jurisdiction == Jurisdiction::PeakBilled;

        let (flows_with, peaks_before, peaks_after) = if peak_billed {
            let shaved = optimizer.run(&with);
            (shaved.flows, shaved.peaks_before, shaved.peaks_after)
        } else if battery.is_some() {
            (with.run(), [0.0; 12], [0.0; 12])
        } else {
            (flows_without.clone(), [0.0; 12], [0.0; 12])
        };
        let peaks = peak_billed.then(|| PeakPair {
            before_kw: mean_of_months(&peaks_before),
            after_kw: mean_of_months(&peaks_after),
        });

        let grid_charging = if inputs.allow_grid_charge && battery.is_some() {
            GridCharging::new(&prices)
        } else {
            None
        };
        let (flows_grid, peaks_grid) = match grid_charging {
            Some(rule) => {
                debug!(threshold = rule.threshold(), "grid charging enabled for C1 dynamic");
                let sim = with.clone().with_grid_charging(rule);
                if peak_billed {
                    let shaved = optimizer.run(&sim);
                    let pair = PeakPair {
                        before_kw: mean_of_months(&shaved.peaks_before),
                        after_kw: mean_of_months(&shaved.peaks_after),
                    };
                    (Some(shaved.flows), Some(pair))
                } else {
                    (Some(sim.run()), None)
                }
            }
            None => (None, None),
        };

        let engine = CostEngine::new(&inputs.tariff, inputs.jurisdiction, dt).with_prices(&prices);
        let imp = &flows_without.import_profile;
        let exp = &flows_without.export_profile;

        debug!("A1: current tariff with net metering, no battery");
        let a1 = engine.evaluate(imp, exp, inputs.current_tariff, true, None)?;

        let mut b1 = BTreeMap::new();
        let mut c1 = BTreeMap::new();
        for variant in TariffVariant::ALL {
            b1.insert(variant, engine.evaluate(imp, exp, variant, false, None)?);
            let result = if battery.is_some() {
                let (flows, variant_peaks) = match &flows_grid {
                    Some(grid) if variant == TariffVariant::Dynamic => (grid, peaks_grid),
                    _ => (&flows_with, peaks),
                };
                engine.evaluate(
                    &flows.import_profile,
                    &flows.export_profile,
                    variant,
                    false,
                    variant_peaks,
                )?
            } else {
                b1[&variant]
            };
            c1.insert(variant, result);
        }

        let saving = b1[&inputs.current_tariff].total_cost - c1[&inputs.current_tariff].total_cost;
        let roi = project(saving, &inputs.roi);

        let load_kwh = inputs.load.total();
        let pv_kwh = inputs.pv.total();
        let usable = battery.map(|b| b.usable_kwh()).unwrap_or(0.0);
        let kpis_without_battery = FlowKpis::from_result(&flows_without, load_kwh, pv_kwh, 0.0);
        let kpis_with_battery = FlowKpis::from_result(&flows_with, load_kwh, pv_kwh, usable);

        info!(
            saving,
            payback_year = ?roi.payback_year,
            roi_percent = roi.roi_percent,
            "scenarios complete"
        );

        Ok(ScenarioBundle {
            jurisdiction: inputs.jurisdiction,
            current_tariff: inputs.current_tariff,
            a1,
            b1,
            c1,
            saving,
            roi,
            monthly_peaks_before: peaks_before,
            monthly_peaks_after: peaks_after,
            flows_without_battery: flows_without,
            flows_with_battery: flows_with,
            flows_with_grid_charging: flows_grid,
            kpis_without_battery,
            kpis_with_battery,
            price_source,
        })
    }
}
