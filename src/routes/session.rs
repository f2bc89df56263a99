use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{accepted, AppError};
use crate::runner::{ControlCommand, ResetScope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/reset", post(reset))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default = "default_scope")]
    pub scope: ResetScope,
}

fn default_scope() -> ResetScope {
    ResetScope::Count
}

/// Queues a reset for the frame loop; applied before the next tick.
pub async fn reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .control()
        .try_send(ControlCommand::Reset(body.scope))
        .map_err(|e| {
            tracing::warn!(error = %e, "reset command rejected");
            AppError::service_unavailable("frame loop is not accepting commands")
        })?;

    tracing::info!(scope = ?body.scope, "reset queued");
    Ok(accepted(serde_json::json!({ "scope": body.scope })))
}
