use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{DEFAULT_THRESHOLD_MULTIPLIER, DEFAULT_TICK_INTERVAL_MS, DEFAULT_WINDOW_SIZE};
use crate::landmarks::EyeSelection;
use crate::pipeline::DetectorConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub log_file_prefix: String,
    pub log_retention_days: usize,
    pub cors_origin: String,
    pub tick_interval_ms: u64,
    pub detector: DetectorConfig,
    pub source: SourceConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Synthetic,
    Trace,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(Self::Synthetic),
            "trace" | "replay" => Ok(Self::Trace),
            other => Err(format!("unknown frame source '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub trace_path: Option<PathBuf>,
    pub synthetic: SyntheticConfig,
}

/// 合成帧源参数，模拟一段带眨眼的眼部亮度信号
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub baseline: u8,
    pub blink_peak: u8,
    pub noise: u8,
    /// 两次眨眼之间的帧数
    pub blink_period_frames: u32,
    /// 每次眨眼持续的帧数
    pub blink_length_frames: u32,
    /// 每帧丢失人脸的概率
    pub face_loss_rate: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            baseline: 60,
            blink_peak: 140,
            noise: 6,
            blink_period_frames: 120,
            blink_length_frames: 4,
            face_loss_rate: 0.01,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub event_channel_capacity: usize,
    pub max_sse_connections: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 64,
            max_sse_connections: 16,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let synthetic_defaults = SyntheticConfig::default();
        let telemetry_defaults = TelemetryConfig::default();

        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            log_file_prefix: env_or("LOG_FILE_PREFIX", "blink-monitor"),
            log_retention_days: env_or_parse("LOG_RETENTION_DAYS", 14_usize).max(1),
            cors_origin: env_or("CORS_ORIGIN", "*"),
            tick_interval_ms: env_or_parse("TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS).max(1),
            detector: DetectorConfig {
                window_size: env_or_parse("BLINK_WINDOW_SIZE", DEFAULT_WINDOW_SIZE),
                threshold_multiplier: env_or_parse(
                    "BLINK_THRESHOLD_MULTIPLIER",
                    DEFAULT_THRESHOLD_MULTIPLIER,
                ),
                eye: env_or_parse("BLINK_EYE", EyeSelection::default()),
            },
            source: SourceConfig {
                kind: env_or_parse("FRAME_SOURCE", SourceKind::Synthetic),
                trace_path: env::var("TRACE_PATH").ok().map(PathBuf::from),
                synthetic: SyntheticConfig {
                    width: env_or_parse("SYNTHETIC_WIDTH", synthetic_defaults.width),
                    height: env_or_parse("SYNTHETIC_HEIGHT", synthetic_defaults.height),
                    baseline: env_or_parse("SYNTHETIC_BASELINE", synthetic_defaults.baseline),
                    blink_peak: env_or_parse("SYNTHETIC_BLINK_PEAK", synthetic_defaults.blink_peak),
                    noise: env_or_parse("SYNTHETIC_NOISE", synthetic_defaults.noise),
                    blink_period_frames: env_or_parse(
                        "SYNTHETIC_BLINK_PERIOD",
                        synthetic_defaults.blink_period_frames,
                    ),
                    blink_length_frames: env_or_parse(
                        "SYNTHETIC_BLINK_LENGTH",
                        synthetic_defaults.blink_length_frames,
                    ),
                    face_loss_rate: env_or_parse(
                        "SYNTHETIC_FACE_LOSS_RATE",
                        synthetic_defaults.face_loss_rate,
                    ),
                    seed: env_or_parse("SYNTHETIC_SEED", synthetic_defaults.seed),
                },
            },
            telemetry: TelemetryConfig {
                event_channel_capacity: env_or_parse(
                    "EVENT_CHANNEL_CAPACITY",
                    telemetry_defaults.event_channel_capacity,
                )
                .max(1),
                max_sse_connections: env_or_parse(
                    "MAX_SSE_CONNECTIONS",
                    telemetry_defaults.max_sse_connections,
                ),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "PORT",
            "RUST_LOG",
            "TICK_INTERVAL_MS",
            "BLINK_WINDOW_SIZE",
            "BLINK_THRESHOLD_MULTIPLIER",
            "BLINK_EYE",
            "FRAME_SOURCE",
            "TRACE_PATH",
            "ENABLE_FILE_LOGS",
            "LOG_FILE_PREFIX",
            "LOG_RETENTION_DAYS",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.log_file_prefix, "blink-monitor");
        assert_eq!(cfg.log_retention_days, 14);
        assert_eq!(cfg.tick_interval_ms, 33);
        assert_eq!(cfg.detector.window_size, 100);
        assert_eq!(cfg.detector.threshold_multiplier, 1.5);
        assert_eq!(cfg.detector.eye, EyeSelection::Right);
        assert_eq!(cfg.source.kind, SourceKind::Synthetic);
        assert!(cfg.source.trace_path.is_none());
    }

    #[test]
    fn parses_detector_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("BLINK_WINDOW_SIZE", "50");
        env::set_var("BLINK_THRESHOLD_MULTIPLIER", "1.25");
        env::set_var("BLINK_EYE", "average");
        env::set_var("FRAME_SOURCE", "trace");
        env::set_var("TRACE_PATH", "/tmp/trace.txt");

        let cfg = Config::from_env();
        assert_eq!(cfg.detector.window_size, 50);
        assert_eq!(cfg.detector.threshold_multiplier, 1.25);
        assert_eq!(cfg.detector.eye, EyeSelection::Average);
        assert_eq!(cfg.source.kind, SourceKind::Trace);
        assert_eq!(cfg.source.trace_path, Some(PathBuf::from("/tmp/trace.txt")));
        clear_keys(managed_keys());
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("BLINK_EYE", "nose");
        env::set_var("TICK_INTERVAL_MS", "0");
        env::set_var("ENABLE_FILE_LOGS", "maybe");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.detector.eye, EyeSelection::Right);
        assert_eq!(cfg.tick_interval_ms, 1);
        assert!(!cfg.enable_file_logs);
        clear_keys(managed_keys());
    }
}
