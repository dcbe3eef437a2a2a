//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use battery_roi::devices::{BatterySpec, ProfileGenerator, ProfileSpec};
use battery_roi::scenario::RunInputs;
use battery_roi::series::TimeSeries;

/// One hourly day: low load with an evening bump, PV around noon.
pub fn day_profiles() -> (TimeSeries, TimeSeries) {
    let load: Vec<f64> = (0..24)
        .map(|h| match h {
            17..=21 => 2.5,
            7..=8 => 1.2,
            _ => 0.4,
        })
        .collect();
    let pv: Vec<f64> = (0..24)
        .map(|h| match h {
            10..=14 => 3.0,
            8..=9 | 15..=16 => 1.0,
            _ => 0.0,
        })
        .collect();
    (TimeSeries::hourly(load), TimeSeries::hourly(pv))
}

/// Default battery (10 kWh, 5 kW, 90% DoD, 90% round trip).
pub fn default_battery() -> BatterySpec {
    BatterySpec::new(10.0, 5.0, 0.9, 0.9)
}

/// Run inputs over one synthetic day with the default battery.
pub fn day_inputs() -> RunInputs {
    let (load, pv) = day_profiles();
    RunInputs {
        battery: Some(default_battery()),
        ..RunInputs::new(load, pv)
    }
}

/// Full synthetic year at the given interval (seeded, no noise).
pub fn year_profiles(dt_hours: f64) -> (TimeSeries, TimeSeries) {
    let spec = ProfileSpec {
        dt_hours,
        ..ProfileSpec::default()
    };
    let mut generator = ProfileGenerator::new(spec).expect("default profile spec is valid");
    (generator.load_profile(), generator.pv_profile())
}
