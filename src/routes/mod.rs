pub mod events;
pub mod health;
pub mod session;
pub mod telemetry;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};

use crate::response::ErrorBody;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/telemetry", telemetry::router())
        .nest("/events", events::router())
        .nest("/session", session::router());

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            code: "NOT_FOUND".to_string(),
            message: "route not found".to_string(),
        }),
    )
}
