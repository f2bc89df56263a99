//! 基于眼部亮度的实时眨眼检测
//!
//! 每帧从眼部矩形中心取一个亮度样本，放入固定容量的滑动窗口，
//! 以窗口均值 × K 为阈值，用两状态机做边沿触发的眨眼计数。
//!
//! ## 模块
//! - `sampler`: 眼部亮度采样
//! - `window`: 滑动窗口与基线
//! - `blink`: 眨眼状态机
//! - `pipeline`: 逐帧流水线
//! - `telemetry`: 只读观测快照与波形投影
//!
//! 默认的 `server` feature 额外提供帧循环、配置、日志与 HTTP 观测接口。

pub mod blink;
pub mod constants;
pub mod error;
pub mod frame;
pub mod landmarks;
pub mod pipeline;
pub mod sampler;
pub mod telemetry;
pub mod window;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod logging;
#[cfg(feature = "server")]
pub mod response;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod runner;
#[cfg(feature = "server")]
pub mod source;
#[cfg(feature = "server")]
pub mod state;

pub use blink::{BlinkEvent, BlinkState, BlinkStateMachine, Evaluation};
pub use error::{BlinkError, BlinkResult};
pub use frame::{Frame, PixelFormat};
pub use landmarks::{EyeRegion, EyeSelection, FaceLandmarks, Point};
pub use pipeline::{BlinkPipeline, DetectorConfig, SkipReason, TickOutcome};
pub use sampler::LuminanceSampler;
pub use telemetry::{Telemetry, Waveform};
pub use window::{LuminanceSample, SlidingWindow, WindowState};
