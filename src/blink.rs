//! 眨眼检测状态机
//!
//! 两状态有限状态机：Open（睁眼）⇄ Closed（闭眼）。
//! 阈值 = 窗口均值 × K。注意极性：采样点亮度**高于**阈值表示眼睑闭合
//! （眼睑反光更强），回落到阈值以下表示重新睁眼。
//! 只在 Closed → Open 的边沿计数一次。不做迟滞，也没有最短停留时间，
//! 阈值附近的噪声可能导致状态抖动。

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_THRESHOLD_MULTIPLIER;
use crate::error::{BlinkError, BlinkResult};
use crate::window::{LuminanceSample, WindowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlinkState {
    #[default]
    Open,
    Closed,
}

impl BlinkState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// 一次完整眨眼（闭合后重新睁开）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkEvent {
    /// 本次眨眼之后的累计次数
    pub count: u64,
    /// 检测到睁眼边沿的时间戳（毫秒）
    pub completed_at_ms: f64,
    /// 保持闭合状态的时长（毫秒）
    pub closed_for_ms: f64,
}

/// Result of evaluating one full-window sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub previous: BlinkState,
    pub state: BlinkState,
    pub blink_completed: bool,
    pub threshold: f64,
    pub latest: LuminanceSample,
    pub blink: Option<BlinkEvent>,
}

impl Evaluation {
    pub fn changed(&self) -> bool {
        self.previous != self.state
    }
}

#[derive(Debug, Clone)]
pub struct BlinkStateMachine {
    multiplier: f64,
    state: BlinkState,
    count: u64,
    closed_since_ms: f64,
}

impl Default for BlinkStateMachine {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
            state: BlinkState::Open,
            count: 0,
            closed_since_ms: 0.0,
        }
    }
}

impl BlinkStateMachine {
    pub fn new(multiplier: f64) -> BlinkResult<Self> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(BlinkError::InvalidConfig(format!(
                "threshold multiplier must be finite and positive, got {multiplier}"
            )));
        }
        Ok(Self {
            multiplier,
            ..Self::default()
        })
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn threshold_for(&self, mean: f64) -> f64 {
        mean * self.multiplier
    }

    /// 用最新样本推进状态机；窗口未满时返回 `NotReady` 且不改变任何状态
    pub fn evaluate(&mut self, window: &WindowState, timestamp_ms: f64) -> BlinkResult<Evaluation> {
        let Some(baseline) = window.baseline() else {
            return Err(BlinkError::NotReady {
                len: window.len(),
                capacity: window.capacity(),
            });
        };

        let threshold = self.threshold_for(baseline);
        let latest = window.latest();
        let elevated = f64::from(latest.value()) >= threshold;
        let previous = self.state;
        let mut blink = None;

        match (previous, elevated) {
            (BlinkState::Open, true) => {
                self.state = BlinkState::Closed;
                self.closed_since_ms = timestamp_ms;
                tracing::trace!(latest = latest.value(), threshold, "eye closed");
            }
            (BlinkState::Closed, false) => {
                self.state = BlinkState::Open;
                self.count += 1;
                let event = BlinkEvent {
                    count: self.count,
                    completed_at_ms: timestamp_ms,
                    closed_for_ms: (timestamp_ms - self.closed_since_ms).max(0.0),
                };
                tracing::debug!(
                    count = event.count,
                    closed_for_ms = event.closed_for_ms,
                    "blink completed"
                );
                blink = Some(event);
            }
            (BlinkState::Open, false) | (BlinkState::Closed, true) => {}
        }

        Ok(Evaluation {
            previous,
            state: self.state,
            blink_completed: blink.is_some(),
            threshold,
            latest,
            blink,
        })
    }

    /// 仅清零计数（外部显式指令）
    pub fn reset_count(&mut self) {
        self.count = 0;
    }

    pub fn reset(&mut self) {
        self.state = BlinkState::Open;
        self.count = 0;
        self.closed_since_ms = 0.0;
    }
}
