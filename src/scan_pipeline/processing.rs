//! Line processing module
//!
//! This module contains the orchestration of the consumer side of a scan.

mod config;
mod line_processor;

#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_RASTER_HEIGHT, DEFAULT_RASTER_WIDTH, PipelineConfig, PipelineConfigBuilder,
};
pub use line_processor::{LineProcessor, Minimum, MinimumAxis, PollReport};
