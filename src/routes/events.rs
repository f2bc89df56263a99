use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::response::AppError;
use crate::state::AppState;

struct SseGuard(Arc<AtomicUsize>);

impl Drop for SseGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(sse_handler))
}

/// Streams completed blinks as `event: blink`.
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let max_sse = state.config().telemetry.max_sse_connections;
    let counter = state.sse_connections().clone();
    let current = counter.fetch_add(1, Ordering::SeqCst);
    if current >= max_sse {
        counter.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests("Too many SSE connections"));
    }

    let mut events_rx = state.subscribe_events();
    let mut shutdown_rx = state.shutdown_rx();

    let stream = async_stream::stream! {
        let _guard = SseGuard(counter);

        loop {
            tokio::select! {
                received = events_rx.recv() => match received {
                    Ok(notification) => {
                        match Event::default().event("blink").json_data(&notification) {
                            Ok(event) => {
                                yield Ok(event);
                            }
                            Err(e) => tracing::warn!(error = %e, "failed to encode blink event"),
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // 订阅方过慢，告知丢失条数后继续
                        tracing::debug!(skipped, "sse subscriber lagged");
                        yield Ok(Event::default()
                            .event("lagged")
                            .data(skipped.to_string()));
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
