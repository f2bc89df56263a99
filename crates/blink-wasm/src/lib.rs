//! 眨眼检测 WASM 绑定
//!
//! 浏览器端每帧把 `ImageData` 的 RGBA 缓冲区和 68 点人脸关键点
//! （扁平数组 `[x0, y0, x1, y1, ...]`）交给 `BlinkMonitor.process`，
//! 得到本帧的状态与计数。没有检测到人脸时传入空数组。

use blink_monitor::{
    BlinkPipeline, BlinkState, DetectorConfig, EyeSelection, FaceLandmarks, PixelFormat,
    TickOutcome,
};
use js_sys::Float64Array;
use wasm_bindgen::prelude::*;

/// 单帧处理结果
#[wasm_bindgen]
#[derive(Clone, Copy)]
pub struct FrameResult {
    /// 本帧是否记录了样本
    pub sampled: bool,
    /// 窗口是否已满（开始判定）
    pub ready: bool,
    /// 当前是否处于闭眼状态
    pub closed: bool,
    /// 本帧是否完成了一次眨眼
    pub blink_completed: bool,
    pub blink_count: u32,
    /// 当前阈值，窗口未满时为 NaN
    pub threshold: f64,
    /// 0=采样成功, 1=无人脸, 2=帧无效, 3=区域无效, 4=亮度越界, 5=检测器拒绝
    pub skip_code: u8,
}

#[wasm_bindgen]
pub struct BlinkMonitor {
    pipeline: BlinkPipeline,
}

#[wasm_bindgen]
impl BlinkMonitor {
    /// # 参数
    /// - `window_size`: 滑动窗口帧数，推荐 100
    /// - `threshold_multiplier`: 阈值倍率，推荐 1.5
    /// - `eye`: "left" / "right" / "average"
    #[wasm_bindgen(constructor)]
    pub fn new(
        window_size: usize,
        threshold_multiplier: f64,
        eye: &str,
    ) -> Result<BlinkMonitor, JsError> {
        let eye: EyeSelection = eye.parse()?;
        let pipeline = BlinkPipeline::new(DetectorConfig {
            window_size,
            threshold_multiplier,
            eye,
        })?;
        Ok(Self { pipeline })
    }

    /// 处理一帧 RGBA 图像
    pub fn process(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        landmarks: &[f64],
        timestamp: f64,
    ) -> FrameResult {
        let face = if landmarks.is_empty() {
            None
        } else {
            FaceLandmarks::from_flat(landmarks).ok()
        };
        let outcome = if !landmarks.is_empty() && face.is_none() {
            // 关键点数量不对，按无人脸处理
            self.pipeline.tick_sample(None, timestamp)
        } else {
            self.pipeline.tick_pixels(
                pixels,
                width,
                height,
                PixelFormat::Rgba,
                face.as_ref(),
                timestamp,
            )
        };
        self.result(&outcome)
    }

    /// 直接输入外部计算好的亮度值
    #[wasm_bindgen(js_name = "processSample")]
    pub fn process_sample(&mut self, value: f64, timestamp: f64) -> FrameResult {
        let raw = (!value.is_nan()).then_some(value);
        let outcome = self.pipeline.tick_sample(raw, timestamp);
        self.result(&outcome)
    }

    #[wasm_bindgen(js_name = "getBlinkCount")]
    pub fn get_blink_count(&self) -> u32 {
        self.pipeline.blink_count().min(u64::from(u32::MAX)) as u32
    }

    #[wasm_bindgen(js_name = "getThreshold")]
    pub fn get_threshold(&self) -> f64 {
        self.pipeline.threshold().unwrap_or(f64::NAN)
    }

    #[wasm_bindgen(js_name = "isBlinking")]
    pub fn is_blinking(&self) -> bool {
        self.pipeline.state() == BlinkState::Closed
    }

    /// 窗口内样本（旧 → 新），用于绘制波形
    #[wasm_bindgen(js_name = "getWindow")]
    pub fn get_window(&self) -> Vec<u8> {
        self.pipeline.window().to_vec()
    }

    /// 完整观测快照（JS 对象）
    pub fn telemetry(&self) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.pipeline.telemetry())?)
    }

    /// 波形折线坐标 `[x0, y0, x1, y1, ...]`，最后两项为阈值线 y（无阈值时为 NaN）
    pub fn waveform(&self, width: f64, height: f64) -> Float64Array {
        let wave = self.pipeline.telemetry().waveform(width, height);
        let mut flat: Vec<f64> = wave.points.iter().flat_map(|p| [p.x, p.y]).collect();
        flat.push(wave.threshold_y.unwrap_or(f64::NAN));
        Float64Array::from(flat.as_slice())
    }

    #[wasm_bindgen(js_name = "resetCount")]
    pub fn reset_count(&mut self) {
        self.pipeline.reset_count();
    }

    pub fn reset(&mut self) {
        self.pipeline.reset();
    }
}

impl BlinkMonitor {
    fn result(&self, outcome: &TickOutcome) -> FrameResult {
        let skip_code = match outcome {
            TickOutcome::Skipped(reason) => match reason {
                blink_monitor::SkipReason::NoFace => 1,
                blink_monitor::SkipReason::InvalidFrame => 2,
                blink_monitor::SkipReason::InvalidRegion => 3,
                blink_monitor::SkipReason::OutOfRange => 4,
                blink_monitor::SkipReason::Detector => 5,
            },
            _ => 0,
        };
        FrameResult {
            sampled: skip_code == 0,
            ready: self.pipeline.window().is_full(),
            closed: self.pipeline.state() == BlinkState::Closed,
            blink_completed: outcome.blink_completed(),
            blink_count: self.get_blink_count(),
            threshold: self.get_threshold(),
            skip_code,
        }
    }
}
