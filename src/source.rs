//! Frame sources for the monitor service.
//!
//! Camera capture and landmark inference live outside this crate; a source
//! hands the frame loop one frame plus the detected landmarks per tick.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::{SourceConfig, SourceKind, SyntheticConfig};
use crate::constants::{
    FACE_LANDMARK_COUNT, LEFT_EYE_BOTTOM, LEFT_EYE_ORIGIN, LEFT_EYE_RIGHT, RIGHT_EYE_BOTTOM,
    RIGHT_EYE_ORIGIN, RIGHT_EYE_RIGHT,
};
use crate::error::BlinkResult;
use crate::frame::Frame;
use crate::landmarks::{EyeRegion, FaceLandmarks, Point};
use crate::window::LuminanceSample;

/// 最小合成帧尺寸，保证眼部矩形至少有一个像素宽
const MIN_SYNTHETIC_DIM: u32 = 32;
/// 单边上限，RGBA 缓冲区最大约 64 MiB
const MAX_SYNTHETIC_DIM: u32 = 4096;

const BACKGROUND_RGBA: [u8; 4] = [96, 84, 72, 255];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read trace {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("trace line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("FRAME_SOURCE=trace requires TRACE_PATH")]
    MissingTracePath,
    #[error("invalid synthetic source config: {0}")]
    InvalidSynthetic(String),
}

/// One capture from the camera plus the landmark detector's answer.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA
    pub pixels: Vec<u8>,
    pub landmarks: Option<FaceLandmarks>,
}

impl CapturedFrame {
    pub fn frame(&self) -> BlinkResult<Frame<'_>> {
        Frame::rgba(self.width, self.height, &self.pixels)
    }
}

pub trait FrameSource: Send {
    fn name(&self) -> &'static str;

    /// `Ok(None)` once the source is exhausted.
    fn capture(&mut self) -> Result<Option<CapturedFrame>, SourceError>;
}

pub fn build_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>, SourceError> {
    let source: Box<dyn FrameSource> = match config.kind {
        SourceKind::Synthetic => Box::new(SyntheticSource::new(config.synthetic.clone())?),
        SourceKind::Trace => {
            let path = config
                .trace_path
                .as_ref()
                .ok_or(SourceError::MissingTracePath)?;
            Box::new(TraceSource::from_path(
                path,
                config.synthetic.width,
                config.synthetic.height,
            )?)
        }
    };
    tracing::info!(source = source.name(), "frame source ready");
    Ok(source)
}

/// 68 点人脸模板：眼部点按比例放置，其余点落在脸部轮廓附近
pub fn face_template(width: u32, height: u32) -> FaceLandmarks {
    let (w, h) = (f64::from(width), f64::from(height));
    let center = Point::new(w * 0.5, h * 0.5);
    let mut points: Vec<Point> = (0..FACE_LANDMARK_COUNT)
        .map(|i| {
            let angle = i as f64 / FACE_LANDMARK_COUNT as f64 * std::f64::consts::TAU;
            Point::new(
                center.x + angle.cos() * w * 0.3,
                center.y + angle.sin() * h * 0.35,
            )
        })
        .collect();

    let eye_w = w * 0.1;
    let eye_h = h * 0.05;
    for (x, (origin, right, bottom)) in [
        (w * 0.3, (LEFT_EYE_ORIGIN, LEFT_EYE_RIGHT, LEFT_EYE_BOTTOM)),
        (w * 0.6, (RIGHT_EYE_ORIGIN, RIGHT_EYE_RIGHT, RIGHT_EYE_BOTTOM)),
    ] {
        let y = h * 0.4;
        // 外眼角、内眼角
        points[origin - 1] = Point::new(x - eye_w * 0.3, y + eye_h * 0.5);
        points[origin + 2] = Point::new(x + eye_w * 1.3, y + eye_h * 0.5);
        points[origin] = Point::new(x, y);
        points[right] = Point::new(x + eye_w, y);
        points[right + 2] = Point::new(x + eye_w, y + eye_h);
        points[bottom] = Point::new(x, y + eye_h);
    }

    // 模板点数固定为 68
    FaceLandmarks::new(points).unwrap_or_else(|_| unreachable!("template has 68 points"))
}

fn validate_dimensions(width: u32, height: u32) -> Result<(), SourceError> {
    let allowed = MIN_SYNTHETIC_DIM..=MAX_SYNTHETIC_DIM;
    if !allowed.contains(&width) || !allowed.contains(&height) {
        return Err(SourceError::InvalidSynthetic(format!(
            "frame sides must be within {MIN_SYNTHETIC_DIM}..={MAX_SYNTHETIC_DIM}, got {width}x{height}"
        )));
    }
    Ok(())
}

/// Renders a frame whose eye regions carry a uniform grey of `luminance`.
pub fn paint_frame(width: u32, height: u32, landmarks: &FaceLandmarks, luminance: u8) -> Vec<u8> {
    let mut pixels = BACKGROUND_RGBA.repeat(width as usize * height as usize);
    for region in [landmarks.left_eye(), landmarks.right_eye()] {
        fill_region(&mut pixels, width, height, &region, luminance);
    }
    pixels
}

fn fill_region(pixels: &mut [u8], width: u32, height: u32, region: &EyeRegion, value: u8) {
    let (width, height) = (width as usize, height as usize);
    let x0 = region.x.max(0.0).floor() as usize;
    let y0 = region.y.max(0.0).floor() as usize;
    let x1 = ((region.x + region.width).ceil() as usize).min(width);
    let y1 = ((region.y + region.height).ceil() as usize).min(height);
    for y in y0..y1 {
        for x in x0..x1 {
            let i = (y * width + x) * 4;
            pixels[i..i + 4].copy_from_slice(&[value, value, value, 255]);
        }
    }
}

/// 合成帧源：基线亮度 + 均匀噪声，按周期插入高亮的“闭眼”段
pub struct SyntheticSource {
    config: SyntheticConfig,
    template: FaceLandmarks,
    rng: StdRng,
    index: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self, SourceError> {
        validate_dimensions(config.width, config.height)?;
        if config.blink_length_frames == 0 || config.blink_length_frames >= config.blink_period_frames {
            return Err(SourceError::InvalidSynthetic(format!(
                "blink length {} must be in 1..{}",
                config.blink_length_frames, config.blink_period_frames
            )));
        }
        if !(0.0..=1.0).contains(&config.face_loss_rate) {
            return Err(SourceError::InvalidSynthetic(format!(
                "face loss rate {} outside [0, 1]",
                config.face_loss_rate
            )));
        }

        Ok(Self {
            template: face_template(config.width, config.height),
            rng: StdRng::seed_from_u64(config.seed),
            index: 0,
            config,
        })
    }

    fn next_luminance(&mut self) -> u8 {
        let period = u64::from(self.config.blink_period_frames);
        let length = u64::from(self.config.blink_length_frames);
        let phase = self.index % period;
        let level = if phase >= period - length {
            self.config.blink_peak
        } else {
            self.config.baseline
        };
        let noise = i16::from(self.config.noise);
        let jitter = if noise > 0 {
            self.rng.gen_range(-noise..=noise)
        } else {
            0
        };
        (i16::from(level) + jitter).clamp(0, 255) as u8
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn capture(&mut self) -> Result<Option<CapturedFrame>, SourceError> {
        let luminance = self.next_luminance();
        self.index += 1;

        let face_lost = self.config.face_loss_rate > 0.0
            && self.rng.gen_bool(self.config.face_loss_rate);
        let (w, h) = (self.config.width, self.config.height);
        let pixels = paint_frame(w, h, &self.template, luminance);

        Ok(Some(CapturedFrame {
            width: w,
            height: h,
            pixels,
            landmarks: (!face_lost).then(|| self.template.clone()),
        }))
    }
}

/// Replays a recorded luminance trace, one value per line.
///
/// `-` or an empty line is a tick where no face was detected; lines starting
/// with `#` are comments.
pub struct TraceSource {
    values: Vec<Option<LuminanceSample>>,
    cursor: usize,
    width: u32,
    height: u32,
    template: FaceLandmarks,
}

impl TraceSource {
    pub fn from_path(path: &Path, width: u32, height: u32) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::parse(&text, width, height)?;
        tracing::info!(path = %path.display(), ticks = source.len(), "trace loaded");
        Ok(source)
    }

    pub fn parse(text: &str, width: u32, height: u32) -> Result<Self, SourceError> {
        validate_dimensions(width, height)?;

        let mut values = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() || line == "-" {
                values.push(None);
                continue;
            }
            let parsed: f64 = line.parse().map_err(|_| SourceError::Parse {
                line: idx + 1,
                message: format!("'{line}' is not a number"),
            })?;
            let sample = LuminanceSample::try_from(parsed).map_err(|e| SourceError::Parse {
                line: idx + 1,
                message: e.to_string(),
            })?;
            values.push(Some(sample));
        }

        Ok(Self {
            values,
            cursor: 0,
            width,
            height,
            template: face_template(width, height),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FrameSource for TraceSource {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn capture(&mut self) -> Result<Option<CapturedFrame>, SourceError> {
        let Some(value) = self.values.get(self.cursor).copied() else {
            return Ok(None);
        };
        self.cursor += 1;

        let luminance = value.map(LuminanceSample::value).unwrap_or(0);
        Ok(Some(CapturedFrame {
            width: self.width,
            height: self.height,
            pixels: paint_frame(self.width, self.height, &self.template, luminance),
            landmarks: value.map(|_| self.template.clone()),
        }))
    }
}
