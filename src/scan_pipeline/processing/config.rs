//! Line processing configuration types

use crate::scan_pipeline::common::error::{Result, ScanError};

/// Width of the default output raster, in pixels
pub const DEFAULT_RASTER_WIDTH: usize = 2556;
/// Height of the default output raster, in lines
pub const DEFAULT_RASTER_HEIGHT: usize = 3543;

/// Configuration for the consumer side of a scan
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Number of lines held back before the oldest one is processed
    pub delay_depth: usize,
    /// Maximum number of lines waiting in the delay buffer; the oldest is
    /// dropped beyond that
    pub max_buffer_size: usize,
    /// Weight of the newest line in the temporal low-pass filter, in (0, 1]
    pub smoothing: f32,
    /// Minimum depth of a dip, on both sides, to count as a feature edge
    pub significance: f32,
    /// Whether filtered lines are searched for significant minima
    pub detect_minima: bool,
    /// Output raster width in pixels
    pub raster_width: usize,
    /// Output raster height in lines
    pub raster_height: usize,
    /// Column of the raster where each line starts
    pub column_offset: usize,
    /// Upper bound on lines processed per `poll`
    pub max_lines_per_poll: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delay_depth: 4,
            max_buffer_size: 256,
            smoothing: 0.2,
            significance: 20.0,
            detect_minima: true,
            raster_width: DEFAULT_RASTER_WIDTH,
            raster_height: DEFAULT_RASTER_HEIGHT,
            column_offset: 0,
            max_lines_per_poll: 64,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.delay_depth == 0 {
            return Err(ScanError::InvalidConfig(
                "delay depth must be at least 1".to_string(),
            ));
        }
        if self.max_buffer_size < self.delay_depth {
            return Err(ScanError::InvalidConfig(format!(
                "max buffer size {} is smaller than delay depth {}",
                self.max_buffer_size, self.delay_depth
            )));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(ScanError::InvalidConfig(format!(
                "smoothing factor {} outside (0, 1]",
                self.smoothing
            )));
        }
        if !(self.significance > 0.0 && self.significance.is_finite()) {
            return Err(ScanError::InvalidConfig(format!(
                "significance {} must be positive",
                self.significance
            )));
        }
        if self.raster_width == 0 || self.raster_height == 0 {
            return Err(ScanError::InvalidConfig(format!(
                "raster dimensions must be non-zero: {}x{}",
                self.raster_width, self.raster_height
            )));
        }
        if self.max_lines_per_poll == 0 {
            return Err(ScanError::InvalidConfig(
                "max lines per poll must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    delay_depth: Option<usize>,
    max_buffer_size: Option<usize>,
    smoothing: Option<f32>,
    significance: Option<f32>,
    detect_minima: Option<bool>,
    raster_width: Option<usize>,
    raster_height: Option<usize>,
    column_offset: Option<usize>,
    max_lines_per_poll: Option<usize>,
}

impl PipelineConfigBuilder {
    pub fn delay_depth(mut self, depth: usize) -> Self {
        self.delay_depth = Some(depth);
        self
    }

    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = Some(size);
        self
    }

    pub fn smoothing(mut self, alpha: f32) -> Self {
        self.smoothing = Some(alpha);
        self
    }

    pub fn significance(mut self, significance: f32) -> Self {
        self.significance = Some(significance);
        self
    }

    pub fn detect_minima(mut self, enable: bool) -> Self {
        self.detect_minima = Some(enable);
        self
    }

    pub fn raster_size(mut self, width: usize, height: usize) -> Self {
        self.raster_width = Some(width);
        self.raster_height = Some(height);
        self
    }

    pub fn column_offset(mut self, offset: usize) -> Self {
        self.column_offset = Some(offset);
        self
    }

    pub fn max_lines_per_poll(mut self, lines: usize) -> Self {
        self.max_lines_per_poll = Some(lines);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            delay_depth: self.delay_depth.unwrap_or(default.delay_depth),
            max_buffer_size: self.max_buffer_size.unwrap_or(default.max_buffer_size),
            smoothing: self.smoothing.unwrap_or(default.smoothing),
            significance: self.significance.unwrap_or(default.significance),
            detect_minima: self.detect_minima.unwrap_or(default.detect_minima),
            raster_width: self.raster_width.unwrap_or(default.raster_width),
            raster_height: self.raster_height.unwrap_or(default.raster_height),
            column_offset: self.column_offset.unwrap_or(default.column_offset),
            max_lines_per_poll: self.max_lines_per_poll.unwrap_or(default.max_lines_per_poll),
        }
    }
}
