//! Fixed 16-bucket color quantization
//!
//! Every sampled pixel is assigned to one of 16 buckets using only the two
//! most significant bits of each channel:
//! - the top bit of red, green and blue forms a 3-bit hue code
//! - the plus flag is set when at least two of the second-highest bits are set
//!
//! Per-bucket counts and channel sums are accumulated in a single pass and
//! turned into averaged [`Cluster`]s at the end.

use crate::cluster::{Cluster, PLUS_FLAG};
use crate::error::{QuantizeError, QuantizeResult};
use image::DynamicImage;
use log::{debug, trace};

/// Channels per pixel when nothing else is configured (red, green, blue, alpha).
pub const DEFAULT_PIXEL_STRIDE: usize = 4;

/// Channel values covered by one unit of the derived sampling step.
///
/// Half a 3840x2160 frame minus one. With the derived step, buffers up to this
/// length are scanned pixel by pixel, and longer buffers are strided so the
/// number of samples stays near `DEFAULT_SAMPLE_BUDGET / pixel_stride`.
pub const DEFAULT_SAMPLE_BUDGET: usize = 3840 * 2160 / 2 - 1;

/// Second-highest bit of each byte of a packed `0xRRGGBB` word.
const SECOND_BITS: u32 = 0x40_40_40;

const BUCKETS: usize = 16;

/// A channel value that can be read as an 8-bit intensity.
///
/// Wider integers saturate at 255 and floats are clamped to `0..=255` and
/// rounded half to even, NaN reading as 0.
pub trait Channel: Copy {
    fn to_u8(self) -> u8;
}

impl Channel for u8 {
    #[inline(always)]
    fn to_u8(self) -> u8 {
        self
    }
}

impl Channel for u16 {
    #[inline(always)]
    fn to_u8(self) -> u8 {
        self.min(255) as u8
    }
}

impl Channel for u32 {
    #[inline(always)]
    fn to_u8(self) -> u8 {
        self.min(255) as u8
    }
}

impl Channel for f32 {
    #[inline(always)]
    fn to_u8(self) -> u8 {
        (self as f64).to_u8()
    }
}

impl Channel for f64 {
    #[inline(always)]
    fn to_u8(self) -> u8 {
        clamp_to_u8(self)
    }
}

/// Store a float the way an 8-bit clamped array does.
#[inline]
fn clamp_to_u8(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, 255.0).round_ties_even() as u8
}

/// Sampling options for [`quantize`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizeOptions {
    /// Number of channel values per pixel; only the first three are read
    pub pixel_stride: usize,
    /// Sub-sampling density, 1 visits every pixel.
    /// `None` derives it from the buffer length, see [`DEFAULT_SAMPLE_BUDGET`]
    pub step: Option<f64>,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            pixel_stride: DEFAULT_PIXEL_STRIDE,
            step: None,
        }
    }
}

impl QuantizeOptions {
    pub fn with_pixel_stride(mut self, pixel_stride: usize) -> Self {
        self.pixel_stride = pixel_stride;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Reject strides that cannot hold an RGB triple and steps that are not
    /// positive finite numbers.
    pub fn validate(&self) -> QuantizeResult<()> {
        if self.pixel_stride < 3 {
            return Err(QuantizeError::InvalidPixelStride(self.pixel_stride));
        }
        if let Some(step) = self.step {
            if !step.is_finite() || step <= 0.0 {
                return Err(QuantizeError::InvalidStep(step));
            }
        }
        Ok(())
    }

    /// The step used for a buffer of `len` channel values.
    pub fn step_for(&self, len: usize) -> f64 {
        self.step
            .unwrap_or_else(|| len as f64 / DEFAULT_SAMPLE_BUDGET as f64)
    }

    /// Distance in channel values between two consecutive samples.
    ///
    /// Always at least one pixel.
    pub fn advance_for(&self, len: usize) -> usize {
        let pixels = self.step_for(len).ceil().max(1.0) as usize;
        self.pixel_stride.saturating_mul(pixels)
    }
}

/// Bucket id of one pixel.
///
/// Bits 2..0 hold the top bit of red, green and blue. Bit 3 is set when at
/// least two of the three second-highest bits are set: masking the packed
/// word leaves at most three bits, and `w & (w - 1)` clears the lowest one.
#[inline(always)]
pub fn bucket_id(r: u8, g: u8, b: u8) -> u8 {
    let word = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
    let second = word & SECOND_BITS;
    let plus = if second & second.wrapping_sub(1) != 0 {
        PLUS_FLAG
    } else {
        0
    };
    plus | ((r >> 7) << 2) | ((g >> 7) << 1) | (b >> 7)
}

/// Per-bucket sample count and channel sums.
#[derive(Default)]
struct Accumulator {
    // count, red, green, blue
    cells: [[u64; 4]; BUCKETS],
    samples: u64,
}

impl Accumulator {
    #[inline(always)]
    fn add(&mut self, r: u8, g: u8, b: u8) {
        let cell = &mut self.cells[bucket_id(r, g, b) as usize];
        cell[0] += 1;
        cell[1] += r as u64;
        cell[2] += g as u64;
        cell[3] += b as u64;
        self.samples += 1;
    }

    fn into_clusters(self) -> Vec<Cluster> {
        let samples = self.samples as f64;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell[0] > 0)
            .map(|(id, &[count, r, g, b])| {
                let n = count as f64;
                let bytes = [
                    clamp_to_u8(r as f64 / n),
                    clamp_to_u8(g as f64 / n),
                    clamp_to_u8(b as f64 / n),
                ];
                let cluster = Cluster::new(id as u8, n / samples, bytes);
                trace!(
                    "bucket {:2}: {} samples, area {:.6}, #{}",
                    cluster.id,
                    count,
                    cluster.area,
                    cluster.hex()
                );
                cluster
            })
            .collect()
    }
}

/// Reduce an interleaved channel buffer to at most 16 clusters.
///
/// Clusters come back ordered by ascending id, one per non-empty bucket, with
/// areas relative to the number of pixels actually sampled. An empty buffer,
/// or one shorter than a single advance, yields no clusters.
pub fn quantize<C: Channel>(buffer: &[C], options: &QuantizeOptions) -> QuantizeResult<Vec<Cluster>> {
    options.validate()?;

    let len = buffer.len();
    if len == 0 {
        return Ok(Vec::new());
    }
    if len < options.pixel_stride {
        return Err(QuantizeError::TruncatedPixel {
            len,
            pixel_stride: options.pixel_stride,
        });
    }

    let advance = options.advance_for(len);
    debug!(
        "quantizing {} channels: stride {}, step {:.4}, advance {}",
        len,
        options.pixel_stride,
        options.step_for(len),
        advance
    );
    if len < advance {
        debug!("buffer shorter than one advance, nothing sampled");
        return Ok(Vec::new());
    }

    // len >= pixel_stride >= 3, so red, green and blue are readable below `end`
    let end = len - 2;
    let mut acc = Accumulator::default();
    let mut i = 0usize;
    while i < end {
        acc.add(buffer[i].to_u8(), buffer[i + 1].to_u8(), buffer[i + 2].to_u8());
        i = match i.checked_add(advance) {
            Some(next) => next,
            None => break,
        };
    }

    debug!("sampled {} pixels", acc.samples);
    Ok(acc.into_clusters())
}

/// [`quantize`] an RGBA buffer with the derived sampling step.
pub fn by16<C: Channel>(buffer: &[C]) -> QuantizeResult<Vec<Cluster>> {
    quantize(buffer, &QuantizeOptions::default())
}

/// Quantize an already decoded image.
///
/// The image is read as RGBA8, so alpha is skipped the same way as for a raw
/// RGBA buffer.
pub fn quantize_image(img: &DynamicImage, step: Option<f64>) -> QuantizeResult<Vec<Cluster>> {
    let raw = img.to_rgba8().into_raw();
    let options = QuantizeOptions {
        pixel_stride: 4,
        step,
    };
    quantize(&raw, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area_sum(clusters: &[Cluster]) -> f64 {
        clusters.iter().map(|c| c.area).sum()
    }

    #[test]
    fn hue_code_uses_top_bits() {
        assert_eq!(bucket_id(0, 0, 0), 0);
        assert_eq!(bucket_id(0, 0, 0x80), 1);
        assert_eq!(bucket_id(0, 0x80, 0), 2);
        assert_eq!(bucket_id(0x80, 0, 0), 4);
        assert_eq!(bucket_id(0x80, 0x80, 0x80), 7);
    }

    #[test]
    fn plus_flag_needs_two_second_bits() {
        // one second-highest bit is not enough
        assert_eq!(bucket_id(0x40, 0, 0), 0);
        assert_eq!(bucket_id(0, 0x40, 0), 0);
        assert_eq!(bucket_id(0, 0, 0xC0), 1);
        // any two of them
        assert_eq!(bucket_id(0x40, 0x40, 0), 8);
        assert_eq!(bucket_id(0x40, 0, 0x40), 8);
        assert_eq!(bucket_id(0, 0x40, 0x40), 8);
        assert_eq!(bucket_id(0x40, 0x40, 0x40), 8);
        assert_eq!(bucket_id(255, 255, 255), 15);
        assert_eq!(bucket_id(255, 0, 0), 4);
        assert_eq!(bucket_id(200, 0, 0), 4);
    }

    #[test]
    fn bucket_ignores_low_bits() {
        for low in 0..0x40u8 {
            assert_eq!(bucket_id(0xC0 | low, 0x40 | low, low), bucket_id(0xC0, 0x40, 0));
        }
    }

    #[test]
    fn derived_step_keeps_small_buffers_dense() {
        let opts = QuantizeOptions::default();
        assert_eq!(opts.advance_for(4), 4);
        assert_eq!(opts.advance_for(DEFAULT_SAMPLE_BUDGET), 4);
        assert_eq!(opts.advance_for(DEFAULT_SAMPLE_BUDGET + 1), 8);
        // 3840x2160 RGBA
        assert_eq!(opts.advance_for(3840 * 2160 * 4), 4 * 9);
    }

    #[test]
    fn explicit_step_rounds_up() {
        let opts = QuantizeOptions::default().with_pixel_stride(3).with_step(1.5);
        assert_eq!(opts.advance_for(1 << 20), 6);
        let opts = QuantizeOptions::default().with_step(0.25);
        assert_eq!(opts.advance_for(1 << 20), 4);
    }

    #[test]
    fn rejects_bad_configuration() {
        let buf = [0u8; 16];
        for stride in [0, 1, 2] {
            let opts = QuantizeOptions::default().with_pixel_stride(stride);
            assert_eq!(quantize(&buf, &opts), Err(QuantizeError::InvalidPixelStride(stride)));
        }
        for step in [0.0, -1.0, f64::INFINITY] {
            let opts = QuantizeOptions::default().with_step(step);
            assert_eq!(quantize(&buf, &opts), Err(QuantizeError::InvalidStep(step)));
        }
        let opts = QuantizeOptions::default().with_step(f64::NAN);
        assert!(matches!(quantize(&buf, &opts), Err(QuantizeError::InvalidStep(_))));
    }

    #[test]
    fn rejects_partial_pixel() {
        assert_eq!(
            by16(&[255u8, 255, 255]),
            Err(QuantizeError::TruncatedPixel {
                len: 3,
                pixel_stride: 4
            })
        );
    }

    #[test]
    fn empty_and_short_buffers_give_nothing() {
        assert_eq!(by16::<u8>(&[]), Ok(Vec::new()));
        let opts = QuantizeOptions::default().with_step(2.0);
        assert_eq!(quantize(&[255u8, 255, 255, 255], &opts), Ok(Vec::new()));
    }

    #[test]
    fn trailing_partial_pixel_is_not_read() {
        // the last two bytes cannot form a full rgb triple
        let buf = [255u8, 0, 0, 255, 0, 0, 255, 255, 0, 255];
        let clusters = by16(&buf).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].id, 1);
        assert_eq!(clusters[1].id, 4);
        assert!((area_sum(&clusters) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn average_rounds_like_clamped_bytes() {
        // mean 227.5 stores as 228, mean 0.5 as 0
        let clusters = by16(&[200u8, 0, 1, 255, 255, 0, 0, 255]).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].bytes, [228, 0, 0]);
    }

    #[test]
    fn accumulator_does_not_wrap() {
        let mut acc = Accumulator::default();
        for _ in 0..100_000 {
            acc.add(255, 255, 255);
        }
        let clusters = acc.into_clusters();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].bytes, [255, 255, 255]);
        assert_eq!(clusters[0].area, 1.0);
    }

    #[test]
    fn wide_channels_saturate() {
        let wide: [u16; 4] = [1000, 300, 256, 65535];
        let clusters = by16(&wide).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id, 15);
        assert_eq!(clusters[0].bytes, [255, 255, 255]);

        let floats: [f32; 4] = [254.6, -3.0, f32::NAN, 1.0];
        let clusters = by16(&floats).unwrap();
        assert_eq!(clusters[0].bytes, [255, 0, 0]);
    }

    #[test]
    fn rgb_stride() {
        let buf = [0u8, 0, 255, 0, 255, 0];
        let opts = QuantizeOptions::default().with_pixel_stride(3);
        let ids: Vec<u8> = quantize(&buf, &opts).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
