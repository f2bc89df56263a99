use thiserror::Error;

/// Errors raised by the per-frame detection path.
///
/// Every variant is recoverable by skipping the current tick; the pipeline
/// never propagates them to its caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlinkError {
    #[error("invalid eye region: {0}")]
    InvalidRegion(String),
    #[error("luminance {value} outside 0..=255")]
    OutOfRange { value: f64 },
    #[error("window not ready: {len}/{capacity} samples")]
    NotReady { len: usize, capacity: usize },
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("invalid landmarks: expected {expected} points, got {actual}")]
    InvalidLandmarks { expected: usize, actual: usize },
    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
}

pub type BlinkResult<T> = Result<T, BlinkError>;
