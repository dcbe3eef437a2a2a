//! TOML-based run configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::devices::battery::{BatteryModel, BatterySpec, InitialSoc};
use crate::devices::profile::{HouseholdKind, ProfileGenerator, ProfileSpec};
use crate::error::EngineError;
use crate::io::import::read_series_csv;
use crate::roi::RoiConfig;
use crate::scenario::RunInputs;
use crate::series::{TimeSeries, validate_interval};
use crate::sim::peak::PeakSettings;
use crate::tariff::{FeedInFee, Jurisdiction, TariffConfig, TariffVariant};

/// Top-level run configuration parsed from TOML.
///
/// Every section has defaults, so a partial TOML file is enough. Load from
/// TOML with [`RunConfig::from_toml_file`] or pick a built-in preset with
/// [`RunConfig::from_preset`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Jurisdiction, current contract and input interval.
    #[serde(default)]
    pub run: RunSection,
    /// Battery under evaluation.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Contract prices and charges.
    #[serde(default)]
    pub tariff: TariffConfig,
    #[serde(default)]
    pub peak: PeakSettings,
    /// Investment and payback horizon.
    #[serde(default)]
    pub roi: RoiConfig,
    /// Measured input series.
    #[serde(default)]
    pub inputs: InputsConfig,
    /// Synthetic profile used when no load or PV file is configured.
    #[serde(default)]
    pub profile: ProfileSpec,
}

/// Jurisdiction and contract of the household.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// `"flat_fee"`/`"nl"` or `"peak_billed"`/`"be"`.
    pub jurisdiction: String,
    /// `"flat"`, `"day_night"` or `"dynamic"` (Dutch names accepted).
    pub current_tariff: String,
    /// Interval of CSV inputs in hours. Inferred from the row count if unset.
    pub dt_hours: Option<f64>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            jurisdiction: "flat_fee".to_string(),
            current_tariff: "flat".to_string(),
            dt_hours: None,
        }
    }
}

/// Battery parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Evaluate without a battery when false.
    pub enabled: bool,
    /// Nominal capacity (kWh).
    pub capacity_kwh: f64,
    /// Maximum charge/discharge power (kW).
    pub power_kw: f64,
    /// Depth of discharge in (0, 1].
    pub dod: f64,
    /// Round-trip efficiency in (0, 1].
    pub round_trip_efficiency: f64,
    /// `"minimum"`, `"midpoint"` or `{ fraction = 0.3 }`.
    pub initial_soc: InitialSoc,
    /// Charge from the grid in the cheapest quarter of dynamic-price hours.
    pub allow_grid_charge: bool,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity_kwh: 10.0,
            power_kw: 5.0,
            dod: 0.9,
            round_trip_efficiency: 0.9,
            initial_soc: InitialSoc::Minimum,
            allow_grid_charge: false,
        }
    }
}

impl BatteryConfig {
    pub fn spec(&self) -> Option<BatterySpec> {
        self.enabled.then(|| {
            BatterySpec::new(
                self.capacity_kwh,
                self.power_kw,
                self.dod,
                self.round_trip_efficiency,
            )
            .with_initial_soc(self.initial_soc)
        })
    }
}

/// Paths of measured input series.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputsConfig {
    pub load_csv: Option<PathBuf>,
    pub pv_csv: Option<PathBuf>,
    /// Dynamic import prices, one per step.
    pub prices_csv: Option<PathBuf>,
}

/// Configuration error with field path and constraint description.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.capacity_kwh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<EngineError> for ConfigError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidConfiguration { field, message } => Self::new(field, message),
            EngineError::UnknownTariffVariant(_) => Self::new("run.current_tariff", e.to_string()),
            EngineError::UnknownJurisdiction(_) => Self::new("run.jurisdiction", e.to_string()),
            other => Self::new("run", other.to_string()),
        }
    }
}

impl RunConfig {
    /// Dutch household on a flat contract with net metering today.
    pub fn nl_flat() -> Self {
        Self {
            tariff: TariffConfig {
                fixed_annual_charge: 60.0,
                feed_in: FeedInFee {
                    monthly: 4.0,
                    ..FeedInFee::default()
                },
                ..TariffConfig::default()
            },
            roi: RoiConfig {
                investment: 6000.0,
                ..RoiConfig::default()
            },
            ..Self::default()
        }
    }

    /// Dutch household on a dynamic contract, feed-in charged per kWh.
    pub fn nl_dynamic() -> Self {
        Self {
            run: RunSection {
                current_tariff: "dynamic".to_string(),
                ..RunSection::default()
            },
            battery: BatteryConfig {
                allow_grid_charge: true,
                ..BatteryConfig::default()
            },
            tariff: TariffConfig {
                fixed_annual_charge: 60.0,
                dynamic_export: 0.03,
                feed_in: FeedInFee {
                    monthly: 0.0,
                    free_kwh: 0.0,
                    per_kwh: 0.11,
                },
                ..TariffConfig::default()
            },
            profile: ProfileSpec {
                household: HouseholdKind::HomeWorker,
                ev: true,
                annual_load_kwh: 5500.0,
                annual_pv_kwh: 4500.0,
                ..ProfileSpec::default()
            },
            roi: RoiConfig {
                investment: 7500.0,
                ..RoiConfig::default()
            },
            ..Self::default()
        }
    }

    /// Belgian household billed on monthly peak demand.
    pub fn be_capacity() -> Self {
        Self {
            run: RunSection {
                jurisdiction: "peak_billed".to_string(),
                current_tariff: "day_night".to_string(),
                dt_hours: None,
            },
            battery: BatteryConfig {
                capacity_kwh: 9.0,
                power_kw: 4.0,
                initial_soc: InitialSoc::Midpoint,
                ..BatteryConfig::default()
            },
            tariff: TariffConfig {
                day_import: 0.38,
                night_import: 0.29,
                day_night_export: 0.04,
                fixed_annual_charge: 100.0,
                capacity_tariff_per_kw: 45.0,
                ..TariffConfig::default()
            },
            profile: ProfileSpec {
                heat_pump: true,
                annual_load_kwh: 6500.0,
                annual_pv_kwh: 5000.0,
                dt_hours: 0.25,
                ..ProfileSpec::default()
            },
            roi: RoiConfig {
                investment: 6500.0,
                degradation: 0.025,
                ..RoiConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["nl_flat", "nl_dynamic", "be_capacity"];

    /// Loads a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "nl_flat" => Ok(Self::nl_flat()),
            "nl_dynamic" => Ok(Self::nl_dynamic()),
            "be_capacity" => Ok(Self::be_capacity()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    pub fn jurisdiction(&self) -> Result<Jurisdiction, ConfigError> {
        Ok(self.run.jurisdiction.parse()?)
    }

    pub fn current_tariff(&self) -> Result<TariffVariant, ConfigError> {
        Ok(self.run.current_tariff.parse()?)
    }

    /// Validates all sections and returns every error found.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.jurisdiction() {
            errors.push(e);
        }
        if let Err(e) = self.current_tariff() {
            errors.push(e);
        }
        if let Some(Err(e)) = self.run.dt_hours.map(validate_interval) {
            errors.push(ConfigError::new("run.dt_hours", e.to_string()));
        }
        if let Some(Err(e)) = self.battery.spec().map(BatteryModel::new) {
            errors.push(e.into());
        }

        let checks = [
            self.tariff.validate(),
            self.roi.validate(),
            self.peak.validate(),
        ];
        errors.extend(checks.into_iter().filter_map(Result::err).map(ConfigError::from));

        if self.inputs.load_csv.is_none() || self.inputs.pv_csv.is_none() {
            if let Err(e) = ProfileGenerator::new(self.profile.clone()) {
                let mut e = ConfigError::from(e);
                if e.field == "run" {
                    e.field = "profile.dt_hours".to_string();
                }
                errors.push(e);
            }
        }

        errors
    }

    /// Loads or generates the input series and assembles [`RunInputs`].
    ///
    /// Load and PV come from CSV when both paths are set, otherwise from the
    /// synthetic profile.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the offending section when a file
    /// cannot be read or a value does not parse.
    pub fn run_inputs(&self) -> Result<RunInputs, ConfigError> {
        let (load, pv) = match (&self.inputs.load_csv, &self.inputs.pv_csv) {
            (Some(load_path), Some(pv_path)) => {
                let load = read_series_csv(load_path)
                    .map_err(|e| ConfigError::new("inputs.load_csv", e.to_string()))?;
                let pv = read_series_csv(pv_path)
                    .map_err(|e| ConfigError::new("inputs.pv_csv", e.to_string()))?;
                match self.run.dt_hours {
                    Some(dt) => (TimeSeries::new(load, dt), TimeSeries::new(pv, dt)),
                    None => (
                        TimeSeries::with_inferred_interval(load),
                        TimeSeries::with_inferred_interval(pv),
                    ),
                }
            }
            _ => {
                let mut generator = ProfileGenerator::new(self.profile.clone())?;
                (generator.load_profile(), generator.pv_profile())
            }
        };

        let dynamic_prices = match &self.inputs.prices_csv {
            Some(path) => Some(
                read_series_csv(path)
                    .map_err(|e| ConfigError::new("inputs.prices_csv", e.to_string()))?,
            ),
            None => None,
        };

        Ok(RunInputs {
            load,
            pv,
            dynamic_prices,
            battery: self.battery.spec(),
            allow_grid_charge: self.battery.allow_grid_charge,
            tariff: self.tariff.clone(),
            current_tariff: self.current_tariff()?,
            jurisdiction: self.jurisdiction()?,
            roi: self.roi,
            peak: self.peak,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        let errors = RunConfig::default().validate();
        assert!(errors.is_empty(), "default should be valid: {errors:?}");
    }

    #[test]
    fn all_presets_are_valid() {
        for name in RunConfig::PRESETS {
            let cfg = RunConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn from_preset_unknown() {
        let e = RunConfig::from_preset("nonexistent").unwrap_err();
        assert_eq!(e.field, "preset");
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[run]
jurisdiction = "be"
current_tariff = "dag_nacht"
dt_hours = 0.25

[battery]
capacity_kwh = 12.0
power_kw = 6.0
dod = 0.95
round_trip_efficiency = 0.92
initial_soc = { fraction = 0.3 }
allow_grid_charge = true

[tariff]
day_import = 0.41
capacity_tariff_per_kw = 50.0

[tariff.feed_in]
monthly = 3.5

[peak]
reduction_factor = 0.8

[roi]
investment = 8000.0
horizon_years = 12
"#;
        let cfg = RunConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.jurisdiction(), Ok(Jurisdiction::PeakBilled));
        assert_eq!(cfg.current_tariff(), Ok(TariffVariant::DayNight));
        assert_eq!(cfg.battery.initial_soc, InitialSoc::Fraction(0.3));
        assert!(cfg.battery.allow_grid_charge);
        assert_eq!(cfg.tariff.feed_in.monthly, 3.5);
        assert_eq!(cfg.peak.reduction_factor, 0.8);
        assert_eq!(cfg.roi.horizon_years, 12);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn unknown_field_rejected() {
        let toml = r#"
[battery]
capacity_kwh = 10.0
bogus_field = true
"#;
        assert!(RunConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = RunConfig::from_toml_str("[battery]\npower_kw = 3.0\n").unwrap();
        assert_eq!(cfg.battery.power_kw, 3.0);
        assert_eq!(cfg.battery.capacity_kwh, 10.0);
        assert_eq!(cfg.run.jurisdiction, "flat_fee");
        assert_eq!(cfg.roi.horizon_years, 15);
    }

    #[test]
    fn validation_collects_every_error() {
        let mut cfg = RunConfig::default();
        cfg.run.current_tariff = "weekend".to_string();
        cfg.battery.dod = 1.5;
        cfg.peak.reduction_factor = -0.1;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "run.current_tariff"));
        assert!(errors.iter().any(|e| e.field == "battery.dod"));
        assert!(errors.iter().any(|e| e.field == "peak.reduction_factor"));
    }

    #[test]
    fn disabled_battery_skips_battery_checks() {
        let mut cfg = RunConfig::default();
        cfg.battery.enabled = false;
        cfg.battery.capacity_kwh = -1.0;
        assert!(cfg.validate().is_empty());
        assert!(cfg.battery.spec().is_none());
    }

    #[test]
    fn bad_input_interval_reported() {
        let mut cfg = RunConfig::default();
        cfg.run.dt_hours = Some(0.7);
        assert!(cfg.validate().iter().any(|e| e.field == "run.dt_hours"));
    }

    #[test]
    fn run_inputs_from_synthetic_profile() {
        let inputs = RunConfig::be_capacity().run_inputs().unwrap();
        assert_eq!(inputs.load.len(), 35_040);
        assert_eq!(inputs.load.dt_hours, 0.25);
        assert_eq!(inputs.jurisdiction, Jurisdiction::PeakBilled);
        assert!(inputs.battery.is_some());
        assert!(inputs.dynamic_prices.is_none());
        assert!(!inputs.allow_grid_charge);
        assert!(RunConfig::nl_dynamic().run_inputs().unwrap().allow_grid_charge);
    }

    #[test]
    fn missing_csv_is_a_config_error() {
        let mut cfg = RunConfig::default();
        cfg.inputs.load_csv = Some(PathBuf::from("/nonexistent/load.csv"));
        cfg.inputs.pv_csv = Some(PathBuf::from("/nonexistent/pv.csv"));
        let err = cfg.run_inputs().unwrap_err();
        assert_eq!(err.field, "inputs.load_csv");
    }
}
