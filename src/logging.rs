//! Tracing setup for the monitor service.
//!
//! Stdout always carries human-readable lines; daily-rotated JSON files are
//! opt-in. Every line emitted by the frame loop sits under a `session` span
//! so files from several runs can be told apart.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {message}")]
    Filter { directive: String, message: String },
    #[error("cannot open log files in {dir}: {source}")]
    Appender {
        dir: PathBuf,
        #[source]
        source: InitError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogInit {
    Installed,
    /// 已有全局 subscriber（测试进程中常见），沿用现有的
    AlreadyInstalled,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub file: Option<FileLogConfig>,
}

#[derive(Debug, Clone)]
pub struct FileLogConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub retention_days: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl From<&Config> for LogConfig {
    fn from(config: &Config) -> Self {
        Self {
            level: config.log_level.clone(),
            file: config.enable_file_logs.then(|| FileLogConfig {
                dir: PathBuf::from(&config.log_dir),
                prefix: config.log_file_prefix.clone(),
                retention_days: config.log_retention_days,
            }),
        }
    }
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::Filter {
        directive: level.to_string(),
        message: e.to_string(),
    })
}

fn build_appender(file: &FileLogConfig) -> Result<RollingFileAppender, LoggingError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&file.prefix)
        .filename_suffix("log")
        .max_log_files(file.retention_days.max(1))
        .build(&file.dir)
        .map_err(|source| LoggingError::Appender {
            dir: file.dir.clone(),
            source,
        })
}

/// Installs the global subscriber.
///
/// Filter and log directory are validated even when a subscriber is already
/// installed, so a bad configuration is reported either way.
pub fn init_tracing(config: &LogConfig) -> Result<LogInit, LoggingError> {
    let env_filter = build_filter(&config.level)?;
    let file_writer = config.file.as_ref().map(build_appender).transpose()?;

    if tracing::dispatcher::has_been_set() {
        return Ok(LogInit::AlreadyInstalled);
    }

    let stdout_layer = fmt::layer().with_target(true).with_thread_ids(false);
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .json()
            .with_current_span(true)
    });

    match Registry::default()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => Ok(LogInit::Installed),
        // 并发初始化时另一方先装上了
        Err(_) if tracing::dispatcher::has_been_set() => Ok(LogInit::AlreadyInstalled),
        Err(e) => Err(e.into()),
    }
}

/// Span wrapping everything the frame loop logs for one detector session.
pub fn session_span(session_id: Uuid) -> tracing::Span {
    tracing::info_span!("session", %session_id)
}
