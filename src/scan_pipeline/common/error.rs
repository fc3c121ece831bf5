use thiserror::Error;

use crate::scan_pipeline::device::ScanStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("No scanning device available")]
    NoDevice,

    #[error("Device error during {operation}: {status}")]
    Device {
        operation: &'static str,
        status: ScanStatus,
    },

    #[error("Invalid value for option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("Unsupported bit depth: {0}")]
    UnsupportedDepth(u32),

    #[error("White reference has {actual} entries, expected {expected}")]
    WhiteReferenceLength { expected: usize, actual: usize },

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Raster write out of bounds: row={row}, col={col}, width={width} (raster is {max_cols}x{max_rows})"
    )]
    OutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        max_cols: usize,
        max_rows: usize,
    },

    #[error("Failed to spawn line acquisition thread: {0}")]
    ThreadSpawn(String),

    #[error("Line acquisition thread panicked")]
    WorkerPanicked,

    #[error("Line source disconnected before the scan completed")]
    SourceDisconnected,
}

impl ScanError {
    pub(crate) fn device(operation: &'static str, status: ScanStatus) -> Self {
        ScanError::Device { operation, status }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
