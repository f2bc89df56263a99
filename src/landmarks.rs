//! 人脸关键点与眼部区域
//!
//! 关键点检测由外部模型完成（68 点布局），本模块只从中取出眼部轮廓点，
//! 推导出用于亮度采样的矩形区域。

use serde::{Deserialize, Serialize};

use crate::constants::{
    FACE_LANDMARK_COUNT, LEFT_EYE_BOTTOM, LEFT_EYE_ORIGIN, LEFT_EYE_RIGHT, RIGHT_EYE_BOTTOM,
    RIGHT_EYE_ORIGIN, RIGHT_EYE_RIGHT,
};
use crate::error::{BlinkError, BlinkResult};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One detected face, 68 points in frame-pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<Point>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point>) -> BlinkResult<Self> {
        if points.len() != FACE_LANDMARK_COUNT {
            return Err(BlinkError::InvalidLandmarks {
                expected: FACE_LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// 从扁平数组构造：`[x0, y0, x1, y1, ...]`，共 136 个数
    pub fn from_flat(coords: &[f64]) -> BlinkResult<Self> {
        if coords.len() != FACE_LANDMARK_COUNT * 2 {
            return Err(BlinkError::InvalidLandmarks {
                expected: FACE_LANDMARK_COUNT,
                actual: coords.len() / 2,
            });
        }
        let points = coords
            .chunks_exact(2)
            .map(|xy| Point::new(xy[0], xy[1]))
            .collect();
        Self::new(points)
    }

    pub fn left_eye(&self) -> EyeRegion {
        self.eye_region(LEFT_EYE_ORIGIN, LEFT_EYE_RIGHT, LEFT_EYE_BOTTOM)
    }

    pub fn right_eye(&self) -> EyeRegion {
        self.eye_region(RIGHT_EYE_ORIGIN, RIGHT_EYE_RIGHT, RIGHT_EYE_BOTTOM)
    }

    fn eye_region(&self, origin: usize, right: usize, bottom: usize) -> EyeRegion {
        // 长度已在构造时校验为 68，索引均小于 68
        let o = self.points[origin];
        EyeRegion {
            x: o.x,
            y: o.y,
            width: self.points[right].x - o.x,
            height: self.points[bottom].y - o.y,
        }
    }
}

/// 眼部采样矩形，左上角 + 宽高
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl EyeRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 几何中心所在像素（向下取整）
    pub fn center_pixel(&self) -> (i64, i64) {
        (
            (self.x + self.width / 2.0).floor() as i64,
            (self.y + self.height / 2.0).floor() as i64,
        )
    }

    /// Checks size and that the whole rectangle lies inside a `width x height` frame.
    pub fn validate_within(&self, frame_width: u32, frame_height: u32) -> BlinkResult<()> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(BlinkError::InvalidRegion(format!("non-finite rectangle {self:?}")));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(BlinkError::InvalidRegion(format!(
                "non-positive size {}x{}",
                self.width, self.height
            )));
        }
        if self.x < 0.0
            || self.y < 0.0
            || self.x + self.width > f64::from(frame_width)
            || self.y + self.height > f64::from(frame_height)
        {
            return Err(BlinkError::InvalidRegion(format!(
                "rectangle ({}, {}, {}, {}) outside {frame_width}x{frame_height} frame",
                self.x, self.y, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Which eye feeds the luminance signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeSelection {
    Left,
    /// 与参考实现一致：两只眼都计算，最终只用右眼
    #[default]
    Right,
    /// 两眼亮度取平均后向下取整
    Average,
}

impl EyeSelection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Average => "average",
        }
    }
}

impl std::str::FromStr for EyeSelection {
    type Err = BlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "average" | "both" => Ok(Self::Average),
            other => Err(BlinkError::InvalidConfig(format!("unknown eye selection '{other}'"))),
        }
    }
}
