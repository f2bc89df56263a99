use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn health_check(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let telemetry = state.telemetry();
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "sessionId": state.session_id(),
        "detector": {
            "warmedUp": telemetry.warmed_up,
            "samples": telemetry.window.len(),
            "windowCapacity": telemetry.window_capacity,
            "framesProcessed": telemetry.frames_processed,
            "framesSkipped": telemetry.frames_skipped,
        }
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Ready once the window holds a full baseline.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.telemetry().warmed_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
