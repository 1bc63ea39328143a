//! Error types for by16

use thiserror::Error;

/// Errors reported for an unusable quantizer configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantizeError {
    /// A pixel must carry at least red, green and blue
    #[error("invalid pixel stride: {0} (need at least 3 channels per pixel)")]
    InvalidPixelStride(usize),

    /// Sampling step is zero, negative or not finite
    #[error("invalid sampling step: {0} (must be a positive finite number)")]
    InvalidStep(f64),

    /// Non-empty buffer that does not hold a single whole pixel
    #[error("buffer of {len} channels is shorter than one pixel of {pixel_stride} channels")]
    TruncatedPixel { len: usize, pixel_stride: usize },
}

/// Result type for quantizer operations
pub type QuantizeResult<T> = Result<T, QuantizeError>;
