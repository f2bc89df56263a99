//! 视频帧视图
//!
//! 帧数据由外部采集层提供，这里只做尺寸校验与像素读取，不持有缓冲区。

use serde::{Deserialize, Serialize};

use crate::error::{BlinkError, BlinkResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Rgba,
    Rgb,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba => 4,
            Self::Rgb => 3,
        }
    }
}

/// Borrowed view over one captured frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(width: u32, height: u32, format: PixelFormat, pixels: &'a [u8]) -> BlinkResult<Self> {
        if width == 0 || height == 0 {
            return Err(BlinkError::InvalidFrame(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
            .ok_or_else(|| BlinkError::InvalidFrame("frame size overflows".to_string()))?;
        if pixels.len() != expected {
            return Err(BlinkError::InvalidFrame(format!(
                "buffer holds {} bytes, {width}x{height} {:?} needs {expected}",
                pixels.len(),
                format
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// RGBA 帧（浏览器 `ImageData` 的布局）
    pub fn rgba(width: u32, height: u32, pixels: &'a [u8]) -> BlinkResult<Self> {
        Self::new(width, height, PixelFormat::Rgba, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGB channels at `(x, y)`, alpha dropped.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        let px = self.pixels.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        let err = Frame::rgba(0, 10, &[]).unwrap_err();
        assert!(matches!(err, BlinkError::InvalidFrame(_)));
    }

    #[test]
    fn rejects_short_buffer() {
        let buf = vec![0_u8; 4 * 4 * 3];
        assert!(Frame::rgba(4, 4, &buf).is_err());
        assert!(Frame::new(4, 4, PixelFormat::Rgb, &buf).is_ok());
    }

    #[test]
    fn reads_rgb_channels() {
        let mut buf = vec![0_u8; 2 * 2 * 4];
        // (1, 1) -> index 3
        buf[12..16].copy_from_slice(&[10, 20, 30, 255]);
        let frame = Frame::rgba(2, 2, &buf).unwrap();
        assert_eq!(frame.pixel(1, 1), Some([10, 20, 30]));
        assert_eq!(frame.pixel(2, 0), None);
    }
}
