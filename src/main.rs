use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, HeaderValue};
use blink_monitor::config::Config;
use blink_monitor::logging::{init_tracing, session_span, LogConfig};
use blink_monitor::pipeline::BlinkPipeline;
use blink_monitor::routes::build_router;
use blink_monitor::runner::FrameLoop;
use blink_monitor::source::build_source;
use blink_monitor::state::AppState;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    if let Err(e) = init_tracing(&LogConfig::from(&config)) {
        panic!("FATAL: {e}. Fix RUST_LOG or the LOG_* environment variables.");
    }
    tracing::info!(?config, "Starting blink-monitor");

    let pipeline = BlinkPipeline::new(config.detector).unwrap_or_else(|e| {
        panic!("FATAL: invalid detector settings: {e}. Fix BLINK_* environment variables.")
    });
    let source = build_source(&config.source)
        .unwrap_or_else(|e| panic!("FATAL: failed to open frame source: {e}"));

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let session_id = Uuid::new_v4();
    let (state, channels) = AppState::new(&config, session_id, shutdown_tx.clone());

    let frame_loop = FrameLoop::new(
        pipeline,
        source,
        Duration::from_millis(config.tick_interval_ms),
        session_id,
    );
    let loop_handle =
        tokio::spawn(frame_loop.run(channels).instrument(session_span(session_id)));

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(build_cors_layer(&config)),
    );

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");

    let server_future =
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));

    if let Err(e) = server_future.await {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    // 服务器因其他原因退出时也要停掉帧循环
    let _ = shutdown_tx.send(());
    match loop_handle.await {
        Ok(summary) => tracing::info!(
            ticks = summary.ticks,
            blinks = summary.blinks,
            source_errors = summary.source_errors,
            "Frame loop finished"
        ),
        Err(e) => tracing::error!(error = %e, "Frame loop task panicked"),
    }
    tracing::info!("Shutdown complete");
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origin.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_credentials(false)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any);
    }

    match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any),
        Err(e) => {
            panic!(
                "FATAL: Invalid CORS_ORIGIN '{}': {}. \
                 Fix the CORS_ORIGIN environment variable.",
                config.cors_origin, e
            );
        }
    }
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
