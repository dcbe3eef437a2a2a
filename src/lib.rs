//! Home battery dispatch and electricity cost engine.
//!
//! Simulates a residential battery against load and PV series, prices the
//! resulting grid flows under several tariff contracts and compares the
//! outcome against the no-battery baseline.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod cost;
pub mod devices;
pub mod error;
pub mod io;
mod report;
pub mod roi;
pub mod scenario;
pub mod series;
pub mod sim;
pub mod tariff;
pub mod telemetry;
