//! Household devices: the battery under evaluation and synthetic profiles.

/// Stationary battery storage model.
pub mod battery;
/// Synthetic load and PV profile generator.
pub mod profile;

pub use battery::{BatteryModel, BatterySpec, InitialSoc};
pub use profile::{HouseholdKind, ProfileGenerator, ProfileSpec};
