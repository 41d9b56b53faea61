//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, HoursQuery, SummaryResponse};

/// `GET /summary` → 200 + `SummaryResponse` JSON
pub async fn get_summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(SummaryResponse::from(&state.outcome)).into_response()
}

/// Returns hourly records, optionally filtered by hour index.
///
/// `GET /hours` → 200 + every record
/// `GET /hours?from=N&to=M` → records with `N <= index <= M`
/// `GET /hours?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_hours(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HoursQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        )
            .into_response();
    }

    let hours: Vec<_> = state
        .outcome
        .annual
        .hours()
        .iter()
        .filter(|h| (from..=to).contains(&h.index))
        .collect();
    Json(hours).into_response()
}

/// `GET /projection` → 200 + `Vec<YearlyProjection>` JSON
pub async fn get_projection(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(&state.outcome.projection).into_response()
}

/// `GET /snapshot` → 200 + flat key-value JSON object
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(&state.snapshot).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;

    fn test_state() -> Arc<AppState> {
        static STATE: OnceLock<Arc<AppState>> = OnceLock::new();
        STATE
            .get_or_init(|| {
                let outcome = ScenarioConfig::baseline()
                    .build()
                    .and_then(|s| s.run())
                    .unwrap();
                Arc::new(AppState::new(outcome).unwrap())
            })
            .clone()
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(test_state());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn summary_returns_200() {
        let (status, json) = get_json("/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["label"], "baseline");
        assert!(json["annual"]["total_load_kwh"].as_f64().unwrap() > 0.0);
        assert!(json["financials"].get("npv").is_some());
        assert!(json["annual"].get("hours").is_none());
    }

    #[tokio::test]
    async fn hours_range_query() {
        let (status, json) = get_json("/hours?from=5&to=10").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0]["index"], 5);
        assert_eq!(rows[5]["index"], 10);
        assert_eq!(rows[0]["tou_period"], "off-peak");
    }

    #[tokio::test]
    async fn hours_returns_full_year() {
        let (_, json) = get_json("/hours").await;
        assert_eq!(json.as_array().unwrap().len(), 8760);
    }

    #[tokio::test]
    async fn hours_invalid_range_returns_400() {
        let (status, json) = get_json("/hours?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn projection_has_one_row_per_year() {
        let (status, json) = get_json("/projection").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 25);
        assert_eq!(rows[0]["year"], 1);
    }

    #[tokio::test]
    async fn snapshot_is_flat() {
        let (status, json) = get_json("/snapshot").await;
        assert_eq!(status, StatusCode::OK);
        let map = json.as_object().unwrap();
        assert!(map.contains_key("summary.npv"));
        assert!(map.contains_key("projection.0.net_cash_flow"));
        assert!(map.contains_key("annual.hours.8759.grid_import_kw"));
        assert!(map.values().all(|v| !v.is_object() && !v.is_array()));
    }
}
