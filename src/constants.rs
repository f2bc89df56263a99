/// 滑动窗口默认容量（帧数）
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// 阈值倍率：threshold = mean(window) * K
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 1.5;

/// 默认采样周期（毫秒），约 30 Hz
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 33;

/// 亮度样本上界（8 位通道）
pub const MAX_LUMINANCE: u8 = 255;

/// 68 点人脸关键点模型的点数
pub const FACE_LANDMARK_COUNT: usize = 68;

/// 左眼：上眼睑左点、上眼睑右点、下眼睑左点
pub const LEFT_EYE_ORIGIN: usize = 37;
pub const LEFT_EYE_RIGHT: usize = 38;
pub const LEFT_EYE_BOTTOM: usize = 41;

/// 右眼：上眼睑左点、上眼睑右点、下眼睑左点
pub const RIGHT_EYE_ORIGIN: usize = 43;
pub const RIGHT_EYE_RIGHT: usize = 44;
pub const RIGHT_EYE_BOTTOM: usize = 47;
