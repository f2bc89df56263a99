use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::WatchStream;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(snapshot))
        .route("/waveform", get(waveform))
        .route("/stream", get(stream))
}

pub async fn snapshot(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.telemetry())
}

#[derive(Debug, Deserialize)]
pub struct WaveformQuery {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

const DEFAULT_CANVAS_WIDTH: f64 = 640.0;
const DEFAULT_CANVAS_HEIGHT: f64 = 480.0;

pub async fn waveform(
    State(state): State<AppState>,
    Query(query): Query<WaveformQuery>,
) -> Result<impl IntoResponse, AppError> {
    let width = query.width.unwrap_or(DEFAULT_CANVAS_WIDTH);
    let height = query.height.unwrap_or(DEFAULT_CANVAS_HEIGHT);
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(AppError::bad_request(
            "INVALID_DIMENSIONS",
            "width and height must be positive",
        ));
    }
    Ok(ok(state.telemetry().waveform(width, height)))
}

/// 每次帧循环发布快照时推送一次
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.telemetry_rx()).filter_map(|telemetry| async move {
        match Event::default().event("telemetry").json_data(&telemetry) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode telemetry event");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
