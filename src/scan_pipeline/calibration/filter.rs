use tracing::debug;

use crate::scan_pipeline::calibration::samples::{MAX_INTENSITY, SampleDepth};
use crate::scan_pipeline::calibration::white_reference::WhiteReference;
use crate::scan_pipeline::common::error::{Result, ScanError};

/// Per-column white normalisation followed by an exponential low-pass filter
/// running along the scan direction.
///
/// Filter state lives for a whole scan; call [`reset`](Self::reset) before
/// the next one.
#[derive(Debug)]
pub struct CalibrationStage {
    depth: SampleDepth,
    alpha: f32,
    white: Option<WhiteReference>,
    lowpass: Vec<f32>,
    primed: Vec<bool>,
    decoded: Vec<f32>,
    lines: u64,
}

impl CalibrationStage {
    /// `samples` is the number of samples per line (pixels × channels),
    /// `alpha` the weight of the newest line in `(0, 1]`.
    pub fn new(samples: usize, depth: SampleDepth, alpha: f32) -> Result<Self> {
        if samples == 0 {
            return Err(ScanError::InvalidConfig(
                "calibration needs at least one sample per line".to_string(),
            ));
        }
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ScanError::InvalidConfig(format!(
                "smoothing factor {alpha} outside (0, 1]"
            )));
        }
        Ok(Self {
            depth,
            alpha,
            white: None,
            lowpass: vec![0.0; samples],
            primed: vec![false; samples],
            decoded: vec![0.0; samples],
            lines: 0,
        })
    }

    pub fn samples(&self) -> usize {
        self.lowpass.len()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Installs a white reference. Its length must equal the number of
    /// samples per line.
    pub fn set_white_reference(&mut self, white: WhiteReference) -> Result<()> {
        if white.len() != self.samples() {
            return Err(ScanError::WhiteReferenceLength {
                expected: self.samples(),
                actual: white.len(),
            });
        }
        debug!("White reference installed ({} samples)", white.len());
        self.white = Some(white);
        Ok(())
    }

    pub fn clear_white_reference(&mut self) {
        self.white = None;
    }

    pub fn white_reference(&self) -> Option<&WhiteReference> {
        self.white.as_ref()
    }

    /// Forgets filter history. The white reference is kept.
    pub fn reset(&mut self) {
        self.lowpass.fill(0.0);
        self.primed.fill(false);
        self.lines = 0;
    }

    pub fn lines_processed(&self) -> u64 {
        self.lines
    }

    /// Calibrates and filters one raw line, returning the filtered samples.
    ///
    /// A short line only updates the columns it covers; bytes beyond the
    /// configured width are ignored.
    pub fn process(&mut self, raw: &[u8]) -> &[f32] {
        let n = self.depth.decode_into(raw, &mut self.decoded);
        let white = self.white.as_ref().map(WhiteReference::values);

        for i in 0..n {
            let value = normalize(self.decoded[i], white.map(|w| w[i]));
            if self.primed[i] {
                self.lowpass[i] = self.lowpass[i] * (1.0 - self.alpha) + value * self.alpha;
            } else {
                self.lowpass[i] = value;
                self.primed[i] = true;
            }
        }

        self.lines += 1;
        &self.lowpass
    }

    /// Filtered samples after the most recent line.
    pub fn filtered(&self) -> &[f32] {
        &self.lowpass
    }

    /// Quantises the filtered samples to bytes.
    pub fn filtered_bytes(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend(
            self.lowpass
                .iter()
                .map(|&v| v.round().clamp(0.0, MAX_INTENSITY) as u8),
        );
    }
}

/// Scales `raw` so that the white level maps to full intensity. Columns
/// without a usable white level pass through.
fn normalize(raw: f32, white: Option<f32>) -> f32 {
    match white {
        Some(w) if w > 0.0 => (raw / w * MAX_INTENSITY).clamp(0.0, MAX_INTENSITY),
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(samples: usize, alpha: f32) -> CalibrationStage {
        CalibrationStage::new(samples, SampleDepth::Eight, alpha).unwrap()
    }

    #[test]
    fn test_first_line_seeds_filter() {
        let mut stage = stage(3, 0.25);
        assert_eq!(stage.process(&[10, 20, 30]), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_exponential_update() {
        let mut stage = stage(2, 0.25);
        stage.process(&[100, 0]);
        let out = stage.process(&[200, 40]);
        assert_eq!(out, &[125.0, 10.0]);
    }

    #[test]
    fn test_white_normalisation() {
        let mut stage = stage(3, 1.0);
        stage
            .set_white_reference(WhiteReference::new(vec![200.0, 100.0, 0.0]))
            .unwrap();
        let out = stage.process(&[100, 200, 42]);
        assert_eq!(out, &[127.5, 255.0, 42.0]);
    }

    #[test]
    fn test_white_reference_length_mismatch() {
        let mut stage = stage(3, 0.5);
        let result = stage.set_white_reference(WhiteReference::new(vec![1.0; 2]));
        assert!(matches!(
            result,
            Err(ScanError::WhiteReferenceLength {
                expected: 3,
                actual: 2
            })
        ));
        assert!(stage.white_reference().is_none());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let lines: Vec<Vec<u8>> = (0..50u8)
            .map(|i| (0..12u8).map(|j| i.wrapping_mul(37).wrapping_add(j * 11)).collect())
            .collect();
        let white = WhiteReference::new((0..12).map(|i| 180.0 + i as f32).collect());

        let run = || {
            let mut stage = stage(12, 0.3);
            stage.set_white_reference(white.clone()).unwrap();
            let mut out = Vec::new();
            let mut bytes = Vec::new();
            for line in &lines {
                stage.process(line);
                stage.filtered_bytes(&mut bytes);
                out.extend_from_slice(&bytes);
            }
            out
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut stage = stage(1, 0.5);
        stage.process(&[200]);
        stage.reset();
        assert_eq!(stage.process(&[10]), &[10.0]);
        assert_eq!(stage.lines_processed(), 1);
    }

    #[test]
    fn test_short_line_updates_covered_columns() {
        let mut stage = stage(3, 0.5);
        stage.process(&[10, 10, 10]);
        let out = stage.process(&[30]);
        assert_eq!(out, &[20.0, 10.0, 10.0]);
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(CalibrationStage::new(4, SampleDepth::Eight, 0.0).is_err());
        assert!(CalibrationStage::new(4, SampleDepth::Eight, 1.5).is_err());
        assert!(CalibrationStage::new(0, SampleDepth::Eight, 0.5).is_err());
    }
}
