//! Line-scan acquisition and processing pipeline
//!
//! This module is split the way data flows through a scan: device control,
//! threaded line acquisition, the delay buffer, calibration and filtering,
//! minimum detection and raster assembly, tied together by the line
//! processor.

pub mod calibration;
pub mod common;
pub mod delay;
pub mod device;
pub mod minima;
pub mod processing;
pub mod raster;
pub mod source;

pub use common::{Result, ScanError};

pub use device::{
    DeviceBackend, DeviceSession, DeviceSettings, DeviceSettingsBuilder, ScanDevice,
    ScanParameters, ScanStatus, SimulatedBackend, SimulatedDevice,
};

pub use source::{LineSource, RawLine, ScanEvent, ScanOutcome, ScanSummary, SourceState};

pub use delay::DelayBuffer;

pub use calibration::{CalibrationStage, SampleDepth, WhiteReference};

pub use minima::{TemporalMinima, find_significant_minima, is_significant_minimum};

pub use raster::OutputRaster;

pub use processing::{
    LineProcessor, Minimum, MinimumAxis, PipelineConfig, PipelineConfigBuilder, PollReport,
};
