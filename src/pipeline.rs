//! 逐帧处理流水线：采样 → 滑动窗口 → 状态机
//!
//! 每个采样周期调用一次 `tick`。任何错误都只导致本帧被跳过，
//! 窗口不前进、状态不变，下一帧自然重试。

use serde::{Deserialize, Serialize};

use crate::blink::{BlinkState, BlinkStateMachine, Evaluation};
use crate::constants::{DEFAULT_THRESHOLD_MULTIPLIER, DEFAULT_WINDOW_SIZE};
use crate::error::{BlinkError, BlinkResult};
use crate::frame::{Frame, PixelFormat};
use crate::landmarks::{EyeSelection, FaceLandmarks};
use crate::sampler::LuminanceSampler;
use crate::telemetry::Telemetry;
use crate::window::{LuminanceSample, SlidingWindow};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    pub window_size: usize,
    pub threshold_multiplier: f64,
    #[serde(default)]
    pub eye: EyeSelection,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            threshold_multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
            eye: EyeSelection::default(),
        }
    }
}

/// Why a tick did not advance the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoFace,
    InvalidFrame,
    InvalidRegion,
    OutOfRange,
    /// 检测器自身拒绝本次判定（未就绪或参数无效）
    Detector,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoFace => "no_face",
            Self::InvalidFrame => "invalid_frame",
            Self::InvalidRegion => "invalid_region",
            Self::OutOfRange => "out_of_range",
            Self::Detector => "detector",
        }
    }

    fn from_error(err: &BlinkError) -> Self {
        match err {
            BlinkError::InvalidFrame(_) => Self::InvalidFrame,
            BlinkError::OutOfRange { .. } => Self::OutOfRange,
            BlinkError::InvalidLandmarks { .. } => Self::NoFace,
            BlinkError::InvalidRegion(_) => Self::InvalidRegion,
            BlinkError::NotReady { .. } | BlinkError::InvalidConfig(_) => Self::Detector,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    /// 已记录样本，窗口尚未填满，不做判定
    Warming { len: usize, capacity: usize },
    Evaluated(Evaluation),
}

impl TickOutcome {
    pub fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            Self::Evaluated(eval) => Some(eval),
            _ => None,
        }
    }

    pub fn blink_completed(&self) -> bool {
        self.evaluation().is_some_and(|e| e.blink_completed)
    }
}

#[derive(Debug, Clone)]
pub struct BlinkPipeline {
    config: DetectorConfig,
    sampler: LuminanceSampler,
    window: SlidingWindow,
    machine: BlinkStateMachine,
    last_tick_ms: Option<f64>,
    tick_interval_ms: Option<f64>,
    frames_processed: u64,
    frames_skipped: u64,
}

impl BlinkPipeline {
    pub fn new(config: DetectorConfig) -> BlinkResult<Self> {
        let window = SlidingWindow::with_capacity(config.window_size)?;
        let machine = BlinkStateMachine::new(config.threshold_multiplier)?;
        tracing::debug!(
            window_size = config.window_size,
            multiplier = config.threshold_multiplier,
            eye = config.eye.as_str(),
            "blink pipeline created"
        );
        Ok(Self {
            config,
            sampler: LuminanceSampler::new(config.eye),
            window,
            machine,
            last_tick_ms: None,
            tick_interval_ms: None,
            frames_processed: 0,
            frames_skipped: 0,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> BlinkState {
        self.machine.state()
    }

    pub fn blink_count(&self) -> u64 {
        self.machine.count()
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    /// 当前阈值；窗口未满时没有意义，返回 `None`
    pub fn threshold(&self) -> Option<f64> {
        self.window
            .is_full()
            .then(|| self.window.mean())
            .flatten()
            .map(|mean| self.machine.threshold_for(mean))
    }

    pub fn tick_interval_ms(&self) -> Option<f64> {
        self.tick_interval_ms
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Processes one captured frame. `None` means the detector found no face.
    pub fn tick(
        &mut self,
        input: Option<(&Frame<'_>, &FaceLandmarks)>,
        timestamp_ms: f64,
    ) -> TickOutcome {
        self.mark_tick(timestamp_ms);

        let Some((frame, landmarks)) = input else {
            return self.skip(SkipReason::NoFace);
        };

        match self.sampler.sample_face(frame, landmarks) {
            Ok(sample) => self.advance(sample, timestamp_ms),
            Err(err) => self.skip_with(&err),
        }
    }

    /// 从原始像素缓冲区处理一帧，帧尺寸不合法时跳过
    pub fn tick_pixels(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        landmarks: Option<&FaceLandmarks>,
        timestamp_ms: f64,
    ) -> TickOutcome {
        match Frame::new(width, height, format, pixels) {
            Ok(frame) => self.tick(landmarks.map(|lm| (&frame, lm)), timestamp_ms),
            Err(err) => {
                self.mark_tick(timestamp_ms);
                self.skip_with(&err)
            }
        }
    }

    /// Feeds a luminance value computed elsewhere (trace replay, host-side sampling).
    pub fn tick_sample(&mut self, raw: Option<f64>, timestamp_ms: f64) -> TickOutcome {
        self.mark_tick(timestamp_ms);

        let Some(raw) = raw else {
            return self.skip(SkipReason::NoFace);
        };
        match LuminanceSample::try_from(raw) {
            Ok(sample) => self.advance(sample, timestamp_ms),
            Err(err) => self.skip_with(&err),
        }
    }

    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            state: self.machine.state(),
            blink_count: self.machine.count(),
            window: self.window.to_vec(),
            window_capacity: self.window.capacity(),
            warmed_up: self.window.is_full(),
            baseline: if self.window.is_full() {
                self.window.mean()
            } else {
                None
            },
            threshold: self.threshold(),
            latest: self.window.latest().map(LuminanceSample::value),
            tick_interval_ms: self.tick_interval_ms,
            fps: self.tick_interval_ms.and_then(fps_from_interval),
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
        }
    }

    pub fn reset_count(&mut self) {
        self.machine.reset_count();
        tracing::info!("blink count reset");
    }

    /// 清空窗口、状态与计数，重新预热
    pub fn reset(&mut self) {
        self.window.clear();
        self.machine.reset();
        self.last_tick_ms = None;
        self.tick_interval_ms = None;
        self.frames_processed = 0;
        self.frames_skipped = 0;
        tracing::info!("blink pipeline reset");
    }

    fn advance(&mut self, sample: LuminanceSample, timestamp_ms: f64) -> TickOutcome {
        let state = self.window.push(sample);
        self.frames_processed += 1;

        if !state.is_full() {
            return TickOutcome::Warming {
                len: state.len(),
                capacity: state.capacity(),
            };
        }

        match self.machine.evaluate(&state, timestamp_ms) {
            Ok(eval) => TickOutcome::Evaluated(eval),
            // 上面已检查 is_full，这里不可达
            Err(err) => {
                tracing::warn!(error = %err, "evaluation on partial window");
                TickOutcome::Warming {
                    len: state.len(),
                    capacity: state.capacity(),
                }
            }
        }
    }

    fn mark_tick(&mut self, timestamp_ms: f64) {
        if let Some(prev) = self.last_tick_ms {
            self.tick_interval_ms = Some(timestamp_ms - prev);
        }
        self.last_tick_ms = Some(timestamp_ms);
    }

    fn skip(&mut self, reason: SkipReason) -> TickOutcome {
        self.frames_skipped += 1;
        tracing::trace!(reason = reason.as_str(), "frame skipped");
        TickOutcome::Skipped(reason)
    }

    fn skip_with(&mut self, err: &BlinkError) -> TickOutcome {
        tracing::debug!(error = %err, "frame skipped");
        self.skip(SkipReason::from_error(err))
    }
}

/// 帧率 = floor(1000 / 间隔)，间隔不为正时无意义
pub fn fps_from_interval(interval_ms: f64) -> Option<u32> {
    if !interval_ms.is_finite() || interval_ms <= 0.0 {
        return None;
    }
    Some((1000.0 / interval_ms).floor() as u32)
}
