//! REST API serving one computed scenario bundle.
//!
//! Provides two GET endpoints:
//! - `/bundle`: the full scenario bundle
//! - `/flows`: per-step flows with the battery, with optional range filtering

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::scenario::ScenarioBundle;
use crate::sim::types::StepRecord;

pub use types::{ErrorResponse, FlowsQuery};

/// Immutable application state shared across all request handlers.
///
/// Built once after the run completes; all data is read-only so no locks
/// are needed.
pub struct AppState {
    pub bundle: ScenarioBundle,
    /// Per-step flows with the battery, joined with load and PV.
    pub records: Vec<StepRecord>,
}

impl AppState {
    /// Prepares state from a bundle and the load/PV it was computed from.
    pub fn new(bundle: ScenarioBundle, load: &[f64], pv: &[f64]) -> Self {
        let records = bundle.flows_with_battery.step_records(load, pv);
        Self { bundle, records }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/bundle", get(handlers::get_bundle))
        .route("/flows", get(handlers::get_flows))
        .with_state(state)
}

/// Binds to `addr` and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
