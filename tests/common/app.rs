use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use tokio::sync::broadcast;
use uuid::Uuid;

use blink_monitor::config::{Config, SourceConfig, SourceKind, SyntheticConfig, TelemetryConfig};
use blink_monitor::pipeline::DetectorConfig;
use blink_monitor::routes::build_router;
use blink_monitor::runner::LoopChannels;
use blink_monitor::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    /// 帧循环一侧的通道，测试直接驱动
    pub channels: LoopChannels,
    pub shutdown_tx: broadcast::Sender<()>,
}

pub fn test_config(window_size: usize, max_sse_connections: usize) -> Config {
    // 直接构造 Config，避免 set_var 在并行测试中互相干扰
    Config {
        host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        log_file_prefix: "blink-monitor-test".to_string(),
        log_retention_days: 1,
        cors_origin: "*".to_string(),
        tick_interval_ms: 1,
        detector: DetectorConfig {
            window_size,
            ..DetectorConfig::default()
        },
        source: SourceConfig {
            kind: SourceKind::Synthetic,
            trace_path: None,
            synthetic: SyntheticConfig {
                width: 64,
                height: 48,
                ..SyntheticConfig::default()
            },
        },
        telemetry: TelemetryConfig {
            event_channel_capacity: 16,
            max_sse_connections,
        },
    }
}

pub fn spawn_with(config: Config) -> TestApp {
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let (state, channels) = AppState::new(&config, Uuid::new_v4(), shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        channels,
        shutdown_tx,
    }
}

pub fn spawn_test_server() -> TestApp {
    spawn_with(test_config(4, 4))
}
