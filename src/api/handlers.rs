//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, FlowsQuery};
use crate::sim::types::StepRecord;

/// `GET /bundle` → 200 + `ScenarioBundle` JSON
pub async fn get_bundle(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.bundle.clone())
}

/// Returns per-step flows, optionally filtered by step range.
///
/// `GET /flows` → 200 + `Vec<StepRecord>` JSON
/// `GET /flows?from=N&to=M` → filtered range (inclusive)
/// `GET /flows?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_flows(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FlowsQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let records: Vec<StepRecord> = state
        .records
        .iter()
        .filter(|r| r.step >= from && r.step <= to)
        .cloned()
        .collect();

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::devices::battery::BatterySpec;
    use crate::scenario::{RunInputs, ScenarioOrchestrator};
    use crate::series::TimeSeries;

    fn make_test_state() -> Arc<AppState> {
        let load: Vec<f64> = (0..24).map(|t| 0.5 + (t % 4) as f64 * 0.25).collect();
        let pv: Vec<f64> = (0..24).map(|t| if (9..16).contains(&t) { 2.0 } else { 0.0 }).collect();
        let inputs = RunInputs {
            battery: Some(BatterySpec::new(5.0, 2.5, 0.9, 0.9)),
            ..RunInputs::new(TimeSeries::hourly(load.clone()), TimeSeries::hourly(pv.clone()))
        };
        let bundle = ScenarioOrchestrator::new().run(&inputs).unwrap();
        Arc::new(AppState::new(bundle, &load, &pv))
    }

    async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(make_test_state());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn bundle_returns_200() {
        let (status, json) = get("/bundle").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("a1").is_some());
        assert!(json["b1"].get("dynamic").is_some());
        assert!(json["c1"].get("day_night").is_some());
        assert!(json.get("roi").is_some());
        assert_eq!(json["price_source"], "fallback");
    }

    #[tokio::test]
    async fn flows_returns_all_steps() {
        let (status, json) = get("/flows").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(24));
    }

    #[tokio::test]
    async fn flows_range_query() {
        let (status, json) = get("/flows?from=5&to=10").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 6); // steps 5..=10
        assert_eq!(rows[0]["step"], 5);
        assert_eq!(rows[5]["step"], 10);
    }

    #[tokio::test]
    async fn flows_invalid_range_returns_400() {
        let (status, json) = get("/flows?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }
}
