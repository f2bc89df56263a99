//! 只读观测数据：供渲染层绘制波形、显示计数与帧率
//!
//! 观测方拿到的是快照，不能反向修改检测状态。

use serde::{Deserialize, Serialize};

use crate::blink::BlinkState;
use crate::constants::MAX_LUMINANCE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    pub state: BlinkState,
    pub blink_count: u64,
    /// 旧 → 新
    pub window: Vec<u8>,
    pub window_capacity: usize,
    pub warmed_up: bool,
    pub baseline: Option<f64>,
    pub threshold: Option<f64>,
    pub latest: Option<u8>,
    pub tick_interval_ms: Option<f64>,
    pub fps: Option<u32>,
    pub frames_processed: u64,
    pub frames_skipped: u64,
}

impl Telemetry {
    pub fn empty(window_capacity: usize) -> Self {
        Self {
            state: BlinkState::Open,
            blink_count: 0,
            window: Vec::new(),
            window_capacity,
            warmed_up: false,
            baseline: None,
            threshold: None,
            latest: None,
            tick_interval_ms: None,
            fps: None,
            frames_processed: 0,
            frames_skipped: 0,
        }
    }

    pub fn waveform(&self, width: f64, height: f64) -> Waveform {
        Waveform::project(&self.window, self.threshold, width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavePoint {
    pub x: f64,
    pub y: f64,
}

/// Luminance history laid out on a `width x height` canvas.
///
/// Baseline sits on the vertical midline; a value of 255 reaches the top edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waveform {
    pub width: f64,
    pub height: f64,
    pub points: Vec<WavePoint>,
    /// 阈值水平线的 y 坐标
    pub threshold_y: Option<f64>,
}

impl Waveform {
    pub fn project(samples: &[u8], threshold: Option<f64>, width: f64, height: f64) -> Self {
        let origin_y = height / 2.0;
        let span = height / 2.0;
        let scale = |v: f64| origin_y - v / f64::from(MAX_LUMINANCE) * span;

        let len = samples.len() as f64;
        let points = samples
            .iter()
            .enumerate()
            .map(|(i, &v)| WavePoint {
                x: i as f64 / len * width,
                y: scale(f64::from(v)),
            })
            .collect();

        Self {
            width,
            height,
            points,
            threshold_y: threshold.map(scale),
        }
    }
}
