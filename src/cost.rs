//! Annual electricity cost of a flow profile under one billing scheme.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::sim::calendar::Calendar;
use crate::tariff::prices::{PriceProvider, PriceSource, price_at, resolve_prices};
use crate::tariff::{Jurisdiction, TariffConfig, TariffVariant};

/// Average monthly peak demand without and with the battery (kW).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakPair {
    pub before_kw: f64,
    pub after_kw: f64,
}

/// One line per charge on the annual bill.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CostBreakdown {
    /// Import cost minus export revenue.
    pub energy: f64,
    pub feed_in: f64,
    pub inverter: f64,
    /// Change in capacity tariff caused by the battery. Negative is a saving.
    pub capacity: f64,
    pub fixed: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.energy + self.feed_in + self.inverter + self.capacity + self.fixed
    }
}

/// Annual cost of one scenario under one tariff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub variant: TariffVariant,
    pub net_metering: bool,
    pub import_kwh: f64,
    pub export_kwh: f64,
    pub total_cost: f64,
    pub breakdown: CostBreakdown,
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} import={:>9.1} kWh  export={:>9.1} kWh  cost={:>10.2}",
            self.variant.as_str(),
            self.import_kwh,
            self.export_kwh,
            self.total_cost
        )
    }
}

/// Prices import/export profiles under a [`TariffConfig`].
///
/// Dynamic prices come from an explicit series or, failing that, from a
/// [`PriceProvider`]. Without either, evaluating the dynamic tariff fails.
///
/// # Examples
///
/// ```
/// use battery_roi::cost::CostEngine;
/// use battery_roi::tariff::{Jurisdiction, TariffConfig, TariffVariant};
///
/// let tariff = TariffConfig {
///     flat_import: 0.40,
///     flat_export: 0.10,
///     ..TariffConfig::default()
/// };
/// let engine = CostEngine::new(&tariff, Jurisdiction::FlatFee, 1.0);
/// let r = engine
///     .evaluate(&[100.0], &[40.0], TariffVariant::Flat, false, None)
///     .unwrap();
/// assert!((r.total_cost - 36.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CostEngine<'a> {
    tariff: &'a TariffConfig,
    jurisdiction: Jurisdiction,
    dt_hours: f64,
    dynamic_prices: Option<&'a [f64]>,
    provider: Option<&'a dyn PriceProvider>,
}

impl<'a> CostEngine<'a> {
    pub fn new(tariff: &'a TariffConfig, jurisdiction: Jurisdiction, dt_hours: f64) -> Self {
        Self {
            tariff,
            jurisdiction,
            dt_hours,
            dynamic_prices: None,
            provider: None,
        }
    }

    pub fn with_prices(mut self, prices: &'a [f64]) -> Self {
        self.dynamic_prices = Some(prices);
        self
    }

    pub fn with_provider(mut self, provider: &'a dyn PriceProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Dynamic price series for a run of `steps` steps, and where it came from.
    pub fn dynamic_prices(&self, steps: usize) -> EngineResult<(Vec<f64>, PriceSource)> {
        resolve_prices(
            self.dynamic_prices,
            self.provider,
            steps,
            self.dt_hours,
            self.tariff.flat_import,
        )
    }

    /// Computes the annual cost of one import/export profile pair.
    ///
    /// Net metering applies to the flat and day/night tariffs only. The
    /// capacity line is filled in only for the peak-billed jurisdiction when
    /// `peaks` is given.
    ///
    /// # Errors
    ///
    /// [`EngineError::LengthMismatch`] when the profiles differ in length,
    /// [`EngineError::MissingDynamicPrices`] when the dynamic tariff has no
    /// price source.
    pub fn evaluate(
        &self,
        import: &[f64],
        export: &[f64],
        variant: TariffVariant,
        net_metering: bool,
        peaks: Option<PeakPair>,
    ) -> EngineResult<ScenarioResult> {
        if import.len() != export.len() {
            return Err(EngineError::LengthMismatch {
                what: "export profile vs import profile",
                expected: import.len(),
                actual: export.len(),
            });
        }

        let import_kwh: f64 = import.iter().sum();
        let export_kwh: f64 = export.iter().sum();
        // the dynamic contract is never netted
        let net_metering = net_metering && variant != TariffVariant::Dynamic;

        let energy = match variant {
            TariffVariant::Flat => self.flat_energy(import_kwh, export_kwh, net_metering),
            TariffVariant::DayNight => {
                self.day_night_energy(import, import_kwh, export_kwh, net_metering)
            }
            TariffVariant::Dynamic => self.dynamic_energy(import, export_kwh)?,
        };

        let capacity = match (self.jurisdiction, peaks) {
            (Jurisdiction::PeakBilled, Some(p)) => {
                (p.after_kw - p.before_kw) * self.tariff.capacity_tariff_per_kw
            }
            _ => 0.0,
        };

        let breakdown = CostBreakdown {
            energy,
            feed_in: self.tariff.feed_in.annual(export_kwh),
            inverter: self.tariff.inverter_kw * self.tariff.inverter_cost_per_kw,
            capacity,
            fixed: self.tariff.fixed_annual_charge,
        };
        debug!(
            %variant,
            net_metering,
            import_kwh,
            export_kwh,
            total = breakdown.total(),
            "evaluated tariff"
        );

        Ok(ScenarioResult {
            variant,
            net_metering,
            import_kwh,
            export_kwh,
            total_cost: breakdown.total(),
            breakdown,
        })
    }

    fn flat_energy(&self, import_kwh: f64, export_kwh: f64, net_metering: bool) -> f64 {
        let t = self.tariff;
        if net_metering {
            let net = import_kwh - export_kwh;
            net.max(0.0) * t.flat_import + net.min(0.0) * t.flat_export
        } else {
            import_kwh * t.flat_import - export_kwh * t.flat_export
        }
    }

    fn day_night_energy(
        &self,
        import: &[f64],
        import_kwh: f64,
        export_kwh: f64,
        net_metering: bool,
    ) -> f64 {
        let t = self.tariff;
        let cal = Calendar::new(self.dt_hours);
        let import_cost: f64 = import
            .iter()
            .enumerate()
            .map(|(i, &e)| e * t.day_night_import(cal.hour_of_day(i)))
            .sum();

        if !net_metering {
            return import_cost - export_kwh * t.day_night_export;
        }

        let net = import_kwh - export_kwh;
        if net > 0.0 {
            let avg_price = if import_kwh > 0.0 {
                import_cost / import_kwh
            } else {
                t.day_import
            };
            net * avg_price
        } else {
            net * t.day_night_export
        }
    }

    fn dynamic_energy(&self, import: &[f64], export_kwh: f64) -> EngineResult<f64> {
        let priced = |prices: &[f64]| -> f64 {
            import
                .iter()
                .enumerate()
                .map(|(i, &e)| e * price_at(prices, i))
                .sum()
        };
        let import_cost = match self.dynamic_prices.filter(|p| !p.is_empty()) {
            Some(prices) => priced(prices),
            None => priced(&self.dynamic_prices(import.len())?.0),
        };
        Ok(import_cost - export_kwh * self.tariff.dynamic_export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::prices::ReferenceDayProvider;

    fn tariff() -> TariffConfig {
        TariffConfig {
            flat_import: 0.40,
            flat_export: 0.10,
            day_import: 0.50,
            night_import: 0.30,
            day_night_export: 0.05,
            dynamic_export: 0.02,
            ..TariffConfig::default()
        }
    }

    #[test]
    fn flat_without_net_metering_sums_line_items() {
        let t = TariffConfig {
            fixed_annual_charge: 100.0,
            inverter_kw: 5.0,
            inverter_cost_per_kw: 10.0,
            ..tariff()
        };
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        let r = engine
            .evaluate(&[60.0, 40.0], &[10.0, 30.0], TariffVariant::Flat, false, None)
            .unwrap();
        assert!((r.breakdown.energy - 36.0).abs() < 1e-9);
        assert!((r.total_cost - 186.0).abs() < 1e-9);
        assert_eq!(r.import_kwh, 100.0);
        assert_eq!(r.export_kwh, 40.0);
    }

    #[test]
    fn flat_net_metering_offsets_export_at_import_price() {
        let t = tariff();
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        let r = engine
            .evaluate(&[100.0], &[40.0], TariffVariant::Flat, true, None)
            .unwrap();
        assert!((r.breakdown.energy - 24.0).abs() < 1e-9);

        let r = engine
            .evaluate(&[40.0], &[100.0], TariffVariant::Flat, true, None)
            .unwrap();
        assert!((r.breakdown.energy + 6.0).abs() < 1e-9);
    }

    #[test]
    fn day_night_prices_by_hour() {
        let t = tariff();
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        let mut import = vec![0.0; 24];
        import[3] = 1.0; // night
        import[12] = 1.0; // day
        let export = vec![0.0; 24];
        let r = engine
            .evaluate(&import, &export, TariffVariant::DayNight, false, None)
            .unwrap();
        assert!((r.breakdown.energy - 0.80).abs() < 1e-9);
    }

    #[test]
    fn day_night_net_metering_uses_weighted_average() {
        let t = tariff();
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        let mut import = vec![0.0; 24];
        import[3] = 1.0;
        import[12] = 1.0;
        let mut export = vec![0.0; 24];
        export[13] = 1.0;
        let r = engine
            .evaluate(&import, &export, TariffVariant::DayNight, true, None)
            .unwrap();
        // net 1 kWh at the average of 0.30 and 0.50
        assert!((r.breakdown.energy - 0.40).abs() < 1e-9);
    }

    #[test]
    fn day_night_net_metering_negative_remainder_uses_export_price() {
        let t = tariff();
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        let r = engine
            .evaluate(&[0.0, 0.0], &[2.0, 2.0], TariffVariant::DayNight, true, None)
            .unwrap();
        assert!((r.breakdown.energy + 0.20).abs() < 1e-9);
    }

    #[test]
    fn dynamic_uses_series_and_last_price_fallback() {
        let t = tariff();
        let prices = [0.10, 0.20];
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0).with_prices(&prices);
        let r = engine
            .evaluate(&[1.0, 1.0, 1.0], &[0.0, 0.0, 5.0], TariffVariant::Dynamic, true, None)
            .unwrap();
        // 0.1 + 0.2 + 0.2 - 5 * 0.02, never netted
        assert!((r.breakdown.energy - 0.40).abs() < 1e-9);
    }

    #[test]
    fn dynamic_result_never_reports_net_metering() {
        let t = tariff();
        let prices = [0.25];
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0).with_prices(&prices);
        let netted = engine
            .evaluate(&[4.0], &[1.0], TariffVariant::Dynamic, true, None)
            .unwrap();
        let plain = engine
            .evaluate(&[4.0], &[1.0], TariffVariant::Dynamic, false, None)
            .unwrap();
        assert!(!netted.net_metering);
        assert_eq!(netted, plain);

        let flat = engine
            .evaluate(&[4.0], &[1.0], TariffVariant::Flat, true, None)
            .unwrap();
        assert!(flat.net_metering);
    }

    #[test]
    fn supplied_prices_take_precedence_over_provider() {
        let t = tariff();
        let provider = ReferenceDayProvider;
        let prices = [0.10, 0.30];
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0)
            .with_prices(&prices)
            .with_provider(&provider);
        let r = engine
            .evaluate(&[1.0, 1.0, 2.0], &[0.0; 3], TariffVariant::Dynamic, false, None)
            .unwrap();
        // 0.1 + 0.3 + 2 * 0.3, provider never consulted
        assert!((r.breakdown.energy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dynamic_with_provider_only() {
        let t = tariff();
        let provider = ReferenceDayProvider;
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0).with_provider(&provider);
        let r = engine
            .evaluate(&[1.0; 24], &[0.0; 24], TariffVariant::Dynamic, false, None)
            .unwrap();
        // reference curve averages to the flat import price
        assert!((r.breakdown.energy - 24.0 * 0.40).abs() < 1e-9);
    }

    #[test]
    fn dynamic_without_prices_fails() {
        let t = tariff();
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        assert_eq!(
            engine.evaluate(&[1.0], &[0.0], TariffVariant::Dynamic, false, None),
            Err(EngineError::MissingDynamicPrices)
        );
    }

    #[test]
    fn capacity_line_only_in_peak_billed_jurisdiction() {
        let t = TariffConfig {
            capacity_tariff_per_kw: 50.0,
            ..tariff()
        };
        let peaks = Some(PeakPair {
            before_kw: 10.0,
            after_kw: 6.0,
        });

        let be = CostEngine::new(&t, Jurisdiction::PeakBilled, 1.0);
        let r = be
            .evaluate(&[0.0], &[0.0], TariffVariant::Flat, false, peaks)
            .unwrap();
        assert!((r.breakdown.capacity + 200.0).abs() < 1e-9);

        let nl = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        let r = nl
            .evaluate(&[0.0], &[0.0], TariffVariant::Flat, false, peaks)
            .unwrap();
        assert_eq!(r.breakdown.capacity, 0.0);

        let r = be
            .evaluate(&[0.0], &[0.0], TariffVariant::Flat, false, None)
            .unwrap();
        assert_eq!(r.breakdown.capacity, 0.0);
    }

    #[test]
    fn feed_in_fee_is_always_added() {
        let t = TariffConfig {
            feed_in: crate::tariff::FeedInFee {
                monthly: 1.0,
                free_kwh: 10.0,
                per_kwh: 0.5,
            },
            ..tariff()
        };
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        let r = engine
            .evaluate(&[0.0], &[20.0], TariffVariant::Flat, true, None)
            .unwrap();
        assert!((r.breakdown.feed_in - 17.0).abs() < 1e-9);
    }

    #[test]
    fn profiles_of_different_length_fail() {
        let t = tariff();
        let engine = CostEngine::new(&t, Jurisdiction::FlatFee, 1.0);
        assert!(matches!(
            engine.evaluate(&[1.0, 2.0], &[0.0], TariffVariant::Flat, false, None),
            Err(EngineError::LengthMismatch { .. })
        ));
    }
}
