//! 眼部亮度采样
//!
//! 取眼部矩形几何中心的像素，R/G/B 三通道求平均后向下取整，
//! 作为这一帧的亮度样本。采样器无状态，每帧调用一次。

use crate::error::{BlinkError, BlinkResult};
use crate::frame::Frame;
use crate::landmarks::{EyeRegion, EyeSelection, FaceLandmarks};
use crate::window::LuminanceSample;

#[derive(Debug, Clone, Copy, Default)]
pub struct LuminanceSampler {
    selection: EyeSelection,
}

impl LuminanceSampler {
    pub fn new(selection: EyeSelection) -> Self {
        Self { selection }
    }

    /// Samples the centre pixel of `region`.
    pub fn sample(&self, frame: &Frame<'_>, region: &EyeRegion) -> BlinkResult<LuminanceSample> {
        region.validate_within(frame.width(), frame.height())?;

        let (cx, cy) = region.center_pixel();
        let [r, g, b] = u32::try_from(cx)
            .ok()
            .zip(u32::try_from(cy).ok())
            .and_then(|(x, y)| frame.pixel(x, y))
            .ok_or_else(|| {
                BlinkError::InvalidRegion(format!("centre ({cx}, {cy}) outside frame"))
            })?;

        let value = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
        LuminanceSample::try_from(i64::from(value))
    }

    /// 按配置的眼睛选择策略对整张脸采样
    pub fn sample_face(
        &self,
        frame: &Frame<'_>,
        landmarks: &FaceLandmarks,
    ) -> BlinkResult<LuminanceSample> {
        match self.selection {
            EyeSelection::Left => self.sample(frame, &landmarks.left_eye()),
            EyeSelection::Right => self.sample(frame, &landmarks.right_eye()),
            EyeSelection::Average => {
                let left = self.sample(frame, &landmarks.left_eye())?;
                let right = self.sample(frame, &landmarks.right_eye())?;
                let avg = (u16::from(left.value()) + u16::from(right.value())) / 2;
                LuminanceSample::try_from(i64::from(avg))
            }
        }
    }
}
