//! Conversion of raw line bytes to intensity samples

use crate::scan_pipeline::common::error::{Result, ScanError};

/// Upper bound of the intensity domain every sample is expressed in.
pub const MAX_INTENSITY: f32 = 255.0;

const U16_TO_INTENSITY: f32 = 1.0 / 257.0;

/// Bit depths a line can be decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDepth {
    Eight,
    /// Sixteen bit samples in native byte order
    Sixteen,
}

impl SampleDepth {
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(SampleDepth::Eight),
            16 => Ok(SampleDepth::Sixteen),
            other => Err(ScanError::UnsupportedDepth(other)),
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleDepth::Eight => 1,
            SampleDepth::Sixteen => 2,
        }
    }

    /// Decodes `bytes` into intensities in `0.0..=255.0`, writing at most
    /// `out.len()` samples. A trailing partial sample is ignored. Returns the
    /// number of samples written.
    pub fn decode_into(self, bytes: &[u8], out: &mut [f32]) -> usize {
        match self {
            SampleDepth::Eight => {
                let n = bytes.len().min(out.len());
                for (dst, &src) in out.iter_mut().zip(&bytes[..n]) {
                    *dst = f32::from(src);
                }
                n
            }
            SampleDepth::Sixteen => {
                let mut n = 0;
                for (dst, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
                    *dst = f32::from(u16::from_ne_bytes([pair[0], pair[1]])) * U16_TO_INTENSITY;
                    n += 1;
                }
                n
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_eight_bit() {
        let mut out = [0.0; 4];
        let n = SampleDepth::Eight.decode_into(&[0, 128, 255], &mut out);
        assert_eq!(n, 3);
        assert_eq!(&out[..3], &[0.0, 128.0, 255.0]);
    }

    #[test]
    fn test_decode_sixteen_bit_scales_to_intensity() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u16::MAX.to_ne_bytes());
        bytes.extend_from_slice(&257u16.to_ne_bytes());
        bytes.push(9);

        let mut out = [0.0; 4];
        let n = SampleDepth::Sixteen.decode_into(&bytes, &mut out);
        assert_eq!(n, 2);
        assert!((out[0] - 255.0).abs() < 1e-3);
        assert!((out[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_unsupported_depth() {
        assert!(matches!(
            SampleDepth::from_bits(1),
            Err(ScanError::UnsupportedDepth(1))
        ));
    }
}
