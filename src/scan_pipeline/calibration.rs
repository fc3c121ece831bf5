//! Calibration and filtering module
//!
//! Normalises each incoming line against a white reference and smooths it
//! with a per-column temporal low-pass filter.

mod filter;
mod samples;
mod white_reference;

pub use filter::CalibrationStage;
pub use samples::{MAX_INTENSITY, SampleDepth};
pub use white_reference::WhiteReference;
