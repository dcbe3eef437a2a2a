//! Billing schemes and the tariff parameters they read.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

pub mod prices;

/// The three billing schemes every scenario is evaluated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffVariant {
    /// One import price and one export price all year.
    Flat,
    /// Separate day and night import prices.
    DayNight,
    /// Per-step import prices.
    Dynamic,
}

impl TariffVariant {
    pub const ALL: [TariffVariant; 3] = [Self::Flat, Self::DayNight, Self::Dynamic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::DayNight => "day_night",
            Self::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for TariffVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TariffVariant {
    type Err = EngineError;

    /// Accepts the English names and the Dutch `enkel`, `dag_nacht`, `dynamisch`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" | "enkel" => Ok(Self::Flat),
            "day_night" | "dag_nacht" => Ok(Self::DayNight),
            "dynamic" | "dynamisch" => Ok(Self::Dynamic),
            _ => Err(EngineError::UnknownTariffVariant(s.to_string())),
        }
    }
}

/// Grid-fee regime of the household's country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    /// Fixed grid fee, no demand charge (NL).
    #[default]
    FlatFee,
    /// Capacity tariff on monthly peak demand (BE).
    PeakBilled,
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlatFee => f.write_str("flat_fee"),
            Self::PeakBilled => f.write_str("peak_billed"),
        }
    }
}

impl FromStr for Jurisdiction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat_fee" | "nl" => Ok(Self::FlatFee),
            "peak_billed" | "be" => Ok(Self::PeakBilled),
            _ => Err(EngineError::UnknownJurisdiction(s.to_string())),
        }
    }
}

/// Supplier charges for feeding energy back into the grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedInFee {
    /// Fixed fee per month.
    pub monthly: f64,
    /// Exported energy per year that is not charged (kWh).
    pub free_kwh: f64,
    /// Fee per exported kWh above the free allowance.
    pub per_kwh: f64,
}

impl FeedInFee {
    /// Annual feed-in charge for a given yearly export.
    pub fn annual(&self, export_kwh: f64) -> f64 {
        self.monthly * 12.0 + (export_kwh - self.free_kwh).max(0.0) * self.per_kwh
    }
}

/// Hours of the day billed at the day rate, `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DayWindow {
    pub start_hour: usize,
    pub end_hour: usize,
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start_hour: 7,
            end_hour: 23,
        }
    }
}

impl DayWindow {
    /// Whether `hour` falls in the day window. A window with
    /// `start_hour > end_hour` wraps past midnight.
    pub fn is_day(&self, hour: usize) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Prices and fixed charges of a household's electricity contract.
///
/// All prices are per kWh, all charges per year, in one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    pub flat_import: f64,
    pub flat_export: f64,

    pub day_import: f64,
    pub night_import: f64,
    pub day_night_export: f64,
    pub day_window: DayWindow,

    /// Export price under the dynamic contract.
    pub dynamic_export: f64,

    /// Standing charge per year.
    pub fixed_annual_charge: f64,
    pub feed_in: FeedInFee,

    /// Inverter size billed by the grid operator (kW).
    pub inverter_kw: f64,
    pub inverter_cost_per_kw: f64,

    /// Price per kW of billed peak per year (peak-billed jurisdiction only).
    pub capacity_tariff_per_kw: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            flat_import: 0.40,
            flat_export: 0.07,
            day_import: 0.42,
            night_import: 0.36,
            day_night_export: 0.07,
            day_window: DayWindow::default(),
            dynamic_export: 0.05,
            fixed_annual_charge: 0.0,
            feed_in: FeedInFee::default(),
            inverter_kw: 0.0,
            inverter_cost_per_kw: 0.0,
            capacity_tariff_per_kw: 0.0,
        }
    }
}

impl TariffConfig {
    /// Checks that every price is finite and every charge non-negative.
    pub fn validate(&self) -> EngineResult<()> {
        let prices = [
            ("tariff.flat_import", self.flat_import),
            ("tariff.flat_export", self.flat_export),
            ("tariff.day_import", self.day_import),
            ("tariff.night_import", self.night_import),
            ("tariff.day_night_export", self.day_night_export),
            ("tariff.dynamic_export", self.dynamic_export),
        ];
        for (field, value) in prices {
            if !value.is_finite() {
                return Err(EngineError::invalid(field, "must be a finite number"));
            }
        }

        let charges = [
            ("tariff.fixed_annual_charge", self.fixed_annual_charge),
            ("tariff.feed_in.monthly", self.feed_in.monthly),
            ("tariff.feed_in.free_kwh", self.feed_in.free_kwh),
            ("tariff.feed_in.per_kwh", self.feed_in.per_kwh),
            ("tariff.inverter_kw", self.inverter_kw),
            ("tariff.inverter_cost_per_kw", self.inverter_cost_per_kw),
            ("tariff.capacity_tariff_per_kw", self.capacity_tariff_per_kw),
        ];
        for (field, value) in charges {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::invalid(field, "must be >= 0"));
            }
        }

        if self.day_window.start_hour > 24 || self.day_window.end_hour > 24 {
            return Err(EngineError::invalid(
                "tariff.day_window",
                "hours must be in 0..=24",
            ));
        }
        Ok(())
    }

    /// Import price of a day/night contract at `hour`.
    pub fn day_night_import(&self, hour: usize) -> f64 {
        if self.day_window.is_day(hour) {
            self.day_import
        } else {
            self.night_import
        }
    }
}
