//! Events emitted by the acquisition thread

use std::time::Duration;

use crate::scan_pipeline::device::ScanStatus;

/// One raster line as delivered to the consumer.
///
/// The bytes are a copy of the acquisition buffer, so the consumer may keep
/// the line for as long as it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    data: Vec<u8>,
}

impl RawLine {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn copy_from(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes the device actually returned for this line.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The device reported the end of the image
    Completed,
    /// `stop()` was requested before the device finished
    Stopped,
    /// The device reported an error status
    Failed(ScanStatus),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanSummary {
    pub outcome: ScanOutcome,
    pub lines: u64,
    pub elapsed: Duration,
}

impl ScanSummary {
    pub fn succeeded(&self) -> bool {
        self.outcome == ScanOutcome::Completed
    }

    pub fn lines_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.lines as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    LineAvailable(RawLine),
    ScanComplete(ScanSummary),
}
