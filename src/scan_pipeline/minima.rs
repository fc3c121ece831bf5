//! Significant local minimum detection
//!
//! A sample is a significant minimum when it is strictly below both
//! neighbours and the dip is at least `significance` deep on each side.

/// Returns true when `b` is a significant minimum between `a` and `c`.
///
/// Non-positive (or NaN) significance never matches, and equal neighbours do
/// not count as a dip, so flat regions are never flagged.
pub fn is_significant_minimum(a: f32, b: f32, c: f32, significance: f32) -> bool {
    significance > 0.0 && b < a && b < c && a - b >= significance && c - b >= significance
}

/// Indices of the pixels in `row` that are significant minima along the
/// row, comparing each channel only with the same channel of the adjacent
/// pixels. `channels` is the interleave stride of `row`.
pub fn find_significant_minima(row: &[f32], channels: usize, significance: f32) -> Vec<usize> {
    let channels = channels.max(1);
    let pixels = row.len() / channels;
    if pixels < 3 {
        return Vec::new();
    }

    (1..pixels - 1)
        .filter(|&x| {
            (0..channels).any(|ch| {
                let at = |px: usize| row[px * channels + ch];
                is_significant_minimum(at(x - 1), at(x), at(x + 1), significance)
            })
        })
        .collect()
}

/// Tracks the last two filtered rows and flags the sample columns whose
/// middle value is a significant minimum in time.
#[derive(Debug, Default)]
pub struct TemporalMinima {
    older: Vec<f32>,
    previous: Vec<f32>,
    rows: usize,
}

impl TemporalMinima {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next filtered row. Once three rows have been seen, returns
    /// the columns of the previous row that dip below both the row before
    /// it and `row`.
    pub fn push(&mut self, row: &[f32], significance: f32) -> Vec<usize> {
        let hits = if self.rows >= 2 {
            let n = row.len().min(self.previous.len()).min(self.older.len());
            (0..n)
                .filter(|&i| {
                    is_significant_minimum(self.older[i], self.previous[i], row[i], significance)
                })
                .collect()
        } else {
            Vec::new()
        };

        std::mem::swap(&mut self.older, &mut self.previous);
        self.previous.clear();
        self.previous.extend_from_slice(row);
        self.rows += 1;
        hits
    }

    pub fn reset(&mut self) {
        self.older.clear();
        self.previous.clear();
        self.rows = 0;
    }
}
