use crate::scan_pipeline::common::error::{Result, ScanError};

/// Fixed-size, row-major image buffer that processed lines are written into.
#[derive(Debug, Clone)]
pub struct OutputRaster {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl OutputRaster {
    /// Allocates a zeroed (black) raster.
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(ScanError::InvalidConfig(format!(
                "raster dimensions must be non-zero: {width}x{height}x{channels}"
            )));
        }
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| {
                ScanError::InvalidConfig(format!("raster {width}x{height}x{channels} too large"))
            })?;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; len],
        })
    }

    /// Copies up to `width` pixels of `line` into row `row`, starting at
    /// column `col`.
    ///
    /// Fails without touching the raster when the target span does not fit.
    /// A `line` holding fewer than `width` pixels writes only the pixels it
    /// has.
    pub fn write_line(&mut self, line: &[u8], row: usize, col: usize, width: usize) -> Result<()> {
        let fits = row < self.height && col.checked_add(width).is_some_and(|end| end <= self.width);
        if !fits {
            return Err(ScanError::OutOfBounds {
                row,
                col,
                width,
                max_cols: self.width,
                max_rows: self.height,
            });
        }

        let pixels = width.min(line.len() / self.channels);
        let start = (row * self.width + col) * self.channels;
        let len = pixels * self.channels;
        self.data[start..start + len].copy_from_slice(&line[..len]);
        Ok(())
    }

    /// Resets every pixel to black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn row(&self, row: usize) -> Option<&[u8]> {
        if row >= self.height {
            return None;
        }
        let stride = self.width * self.channels;
        Some(&self.data[row * stride..(row + 1) * stride])
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels;
        Some(&self.data[start..start + self.channels])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
