//! 滑动窗口基线
//!
//! 固定容量的环形缓冲区，保存最近 N 帧亮度样本（旧 → 新），
//! 同时维护累加和，使 push 与求均值都是 O(1)。
//! 窗口未满时均值不稳定，下游判定必须以 `is_full()` 为前提。

use serde::{Deserialize, Serialize};

use crate::constants::MAX_LUMINANCE;
use crate::error::{BlinkError, BlinkResult};

/// 单帧眼部亮度，取值 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LuminanceSample(u8);

impl LuminanceSample {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for LuminanceSample {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for LuminanceSample {
    type Error = BlinkError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| BlinkError::OutOfRange {
                value: value as f64,
            })
    }
}

impl TryFrom<f64> for LuminanceSample {
    type Error = BlinkError;

    /// 浮点输入向下取整后再检查范围
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value < 0.0 || value >= f64::from(MAX_LUMINANCE) + 1.0 {
            return Err(BlinkError::OutOfRange { value });
        }
        Ok(Self(value.floor() as u8))
    }
}

/// Snapshot of the window after a push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowState {
    len: usize,
    capacity: usize,
    sum: u64,
    latest: LuminanceSample,
}

impl WindowState {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Arithmetic mean of the samples currently held.
    ///
    /// Only meaningful for threshold decisions once [`is_full`](Self::is_full)
    /// holds; use [`baseline`](Self::baseline) to have that enforced.
    pub fn mean(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.sum as f64 / self.len as f64
    }

    /// 窗口已满时的基线（均值），未满返回 `None`
    pub fn baseline(&self) -> Option<f64> {
        self.is_full().then(|| self.mean())
    }

    pub fn latest(&self) -> LuminanceSample {
        self.latest
    }
}

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    buf: Box<[u8]>,
    /// 最旧样本所在下标
    head: usize,
    len: usize,
    sum: u64,
}

impl SlidingWindow {
    pub fn with_capacity(capacity: usize) -> BlinkResult<Self> {
        if capacity == 0 {
            return Err(BlinkError::InvalidConfig(
                "window capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            buf: vec![0_u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
            sum: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// 追加样本；窗口已满时先淘汰最旧样本
    pub fn push(&mut self, sample: LuminanceSample) -> WindowState {
        let cap = self.capacity();
        let value = sample.value();

        if self.len == cap {
            let evicted = self.buf[self.head];
            self.sum -= u64::from(evicted);
            self.buf[self.head] = value;
            self.head = (self.head + 1) % cap;
        } else {
            let tail = (self.head + self.len) % cap;
            self.buf[tail] = value;
            self.len += 1;
        }
        self.sum += u64::from(value);

        WindowState {
            len: self.len,
            capacity: cap,
            sum: self.sum,
            latest: sample,
        }
    }

    /// Validates an externally supplied value before pushing it.
    pub fn push_raw(&mut self, raw: f64) -> BlinkResult<WindowState> {
        let sample = LuminanceSample::try_from(raw)?;
        Ok(self.push(sample))
    }

    /// Current state, `None` while empty.
    pub fn state(&self) -> Option<WindowState> {
        let latest = self.latest()?;
        Some(WindowState {
            len: self.len,
            capacity: self.capacity(),
            sum: self.sum,
            latest,
        })
    }

    pub fn latest(&self) -> Option<LuminanceSample> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.len - 1) % self.capacity();
        Some(LuminanceSample(self.buf[idx]))
    }

    pub fn mean(&self) -> Option<f64> {
        (self.len > 0).then(|| self.sum as f64 / self.len as f64)
    }

    /// 旧 → 新遍历
    pub fn samples(&self) -> impl Iterator<Item = LuminanceSample> + '_ {
        let cap = self.capacity();
        (0..self.len).map(move |i| LuminanceSample(self.buf[(self.head + i) % cap]))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.samples().map(LuminanceSample::value).collect()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.sum = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: u8) -> LuminanceSample {
        LuminanceSample::new(v)
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            SlidingWindow::with_capacity(0),
            Err(BlinkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn fills_then_evicts_oldest() {
        let mut window = SlidingWindow::with_capacity(3).unwrap();
        assert!(!window.push(s(1)).is_full());
        assert!(!window.push(s(2)).is_full());
        let state = window.push(s(3));
        assert!(state.is_full());
        assert_eq!(state.mean(), 2.0);

        let state = window.push(s(7));
        assert_eq!(window.to_vec(), vec![2, 3, 7]);
        assert_eq!(state.len(), 3);
        assert_eq!(state.latest(), s(7));
        assert_eq!(state.mean(), 4.0);
    }

    #[test]
    fn baseline_only_when_full() {
        let mut window = SlidingWindow::with_capacity(2).unwrap();
        let state = window.push(s(10));
        assert_eq!(state.baseline(), None);
        assert_eq!(state.mean(), 10.0);
        let state = window.push(s(20));
        assert_eq!(state.baseline(), Some(15.0));
    }

    #[test]
    fn full_window_of_identical_values_has_exact_mean() {
        let mut window = SlidingWindow::with_capacity(100).unwrap();
        let mut last = None;
        for _ in 0..250 {
            last = Some(window.push(s(37)));
        }
        assert_eq!(last.unwrap().mean(), 37.0);
        assert_eq!(window.mean(), Some(37.0));
    }

    #[test]
    fn push_raw_validates_range() {
        let mut window = SlidingWindow::with_capacity(4).unwrap();
        assert!(matches!(
            window.push_raw(256.0),
            Err(BlinkError::OutOfRange { .. })
        ));
        assert!(window.push_raw(-0.5).is_err());
        assert!(window.push_raw(f64::NAN).is_err());
        assert!(window.is_empty());

        let state = window.push_raw(255.9).unwrap();
        assert_eq!(state.latest(), s(255));
    }

    #[test]
    fn integer_conversion_bounds() {
        assert!(LuminanceSample::try_from(256_i64).is_err());
        assert!(LuminanceSample::try_from(-1_i64).is_err());
        assert_eq!(LuminanceSample::try_from(0_i64).unwrap(), s(0));
    }

    #[test]
    fn clear_resets_contents() {
        let mut window = SlidingWindow::with_capacity(2).unwrap();
        window.push(s(5));
        window.push(s(6));
        window.push(s(7));
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.latest(), None);
        assert_eq!(window.state(), None);
        window.push(s(9));
        assert_eq!(window.to_vec(), vec![9]);
    }
}
