//! Per-step import prices for the dynamic contract.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::sim::calendar::Calendar;

/// Lowest average price a provider scales its curve to.
const MIN_AVERAGE_PRICE: f64 = 0.01;

/// Relative price level per hour of a typical day: low at night, a morning
/// bump and the highest prices in the early evening.
const REFERENCE_DAY: [f64; 24] = [
    0.75, 0.72, 0.70, 0.70, 0.72, 0.78, // 00-05
    0.95, 1.05, 1.10, // 06-08
    1.02, 0.98, 0.95, // 09-11
    0.92, 0.95, 0.98, // 12-14
    1.05, 1.15, 1.25, // 15-17
    1.35, 1.45, 1.40, // 18-20
    1.20, 1.00, 0.85, // 21-23
];

/// Supplies a price series when no measured prices are available.
pub trait PriceProvider: fmt::Debug + Send + Sync {
    /// Returns exactly `steps` prices for steps of `dt_hours`, averaging
    /// roughly `average_price`.
    fn prices(&self, steps: usize, dt_hours: f64, average_price: f64) -> Vec<f64>;
}

/// Tiles a fixed 24-hour curve, normalised to mean 1.0 and scaled by the
/// average import price.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceDayProvider;

impl ReferenceDayProvider {
    /// The reference curve with its mean scaled to 1.0.
    pub fn normalised_day() -> [f64; 24] {
        let mean = REFERENCE_DAY.iter().sum::<f64>() / 24.0;
        REFERENCE_DAY.map(|p| p / mean)
    }
}

impl PriceProvider for ReferenceDayProvider {
    fn prices(&self, steps: usize, dt_hours: f64, average_price: f64) -> Vec<f64> {
        let scale = average_price.max(MIN_AVERAGE_PRICE);
        let day = Self::normalised_day();
        let cal = Calendar::new(dt_hours);
        (0..steps).map(|t| scale * day[cal.hour_of_day(t)]).collect()
    }
}

/// Where the dynamic prices used in a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Supplied series matching the load series step for step.
    Historic,
    /// Supplied series of a different length; steps past its end reuse the
    /// last price.
    Partial,
    /// Generated by a [`PriceProvider`].
    Fallback,
}

/// Picks the dynamic price series for a run of `steps` steps.
///
/// # Errors
///
/// Returns [`EngineError::MissingDynamicPrices`] when neither a non-empty
/// series nor a provider is available.
pub fn resolve_prices(
    supplied: Option<&[f64]>,
    provider: Option<&dyn PriceProvider>,
    steps: usize,
    dt_hours: f64,
    average_price: f64,
) -> EngineResult<(Vec<f64>, PriceSource)> {
    match (supplied.filter(|p| !p.is_empty()), provider) {
        (Some(p), _) if p.len() == steps => Ok((p.to_vec(), PriceSource::Historic)),
        (Some(p), _) => {
            warn!(
                price_steps = p.len(),
                load_steps = steps,
                "dynamic price series length differs from load series"
            );
            Ok((p.to_vec(), PriceSource::Partial))
        }
        (None, Some(provider)) => Ok((
            provider.prices(steps, dt_hours, average_price),
            PriceSource::Fallback,
        )),
        (None, None) => Err(EngineError::MissingDynamicPrices),
    }
}

/// Price at step `t`, falling back to the last price past the end.
pub fn price_at(prices: &[f64], t: usize) -> f64 {
    prices.get(t).or(prices.last()).copied().unwrap_or(0.0)
}
