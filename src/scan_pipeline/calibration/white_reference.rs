use tracing::debug;

use crate::scan_pipeline::calibration::samples::SampleDepth;
use crate::scan_pipeline::common::error::{Result, ScanError};

/// Expected intensity of a white target for every sample column.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteReference {
    values: Vec<f32>,
}

impl WhiteReference {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Averages lines scanned from a white target, column by column.
    ///
    /// Every line must hold at least `samples` samples at `depth`.
    pub fn from_lines<'a, I>(lines: I, depth: SampleDepth, samples: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut sums = vec![0.0f64; samples];
        let mut decoded = vec![0.0f32; samples];
        let mut count = 0usize;

        for line in lines {
            let n = depth.decode_into(line, &mut decoded);
            if n < samples {
                return Err(ScanError::WhiteReferenceLength {
                    expected: samples,
                    actual: n,
                });
            }
            for (sum, &value) in sums.iter_mut().zip(&decoded) {
                *sum += f64::from(value);
            }
            count += 1;
        }

        if count == 0 {
            return Err(ScanError::InvalidConfig(
                "white reference needs at least one line".to_string(),
            ));
        }

        debug!("White reference averaged over {} lines", count);
        Ok(Self {
            values: sums.into_iter().map(|s| (s / count as f64) as f32).collect(),
        })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
