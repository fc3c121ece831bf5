use crate::scan_pipeline::common::error::Result;
use crate::scan_pipeline::device::types::{
    DeviceInfo, OptionDescriptor, OptionValue, ReadOutcome, ScanParameters, ScanStatus,
};

/// Entry point into a device driver stack: enumeration and opening.
pub trait DeviceBackend {
    type Device: ScanDevice;

    fn devices(&mut self) -> Result<Vec<DeviceInfo>>;
    fn open(&mut self, name: &str) -> Result<Self::Device>;
}

/// An open line-scanning device.
///
/// `read` blocks until a line (or part of one) is available. The device is
/// moved onto the acquisition thread for the duration of a scan, hence `Send`.
pub trait ScanDevice: Send + 'static {
    fn option_count(&mut self) -> usize;
    fn option_descriptor(&mut self, index: usize) -> Option<OptionDescriptor>;
    fn get_option(&mut self, index: usize) -> Result<OptionValue>;
    fn set_option(&mut self, index: usize, value: OptionValue) -> Result<()>;

    fn start(&mut self) -> ScanStatus;
    fn parameters(&mut self) -> std::result::Result<ScanParameters, ScanStatus>;
    fn read(&mut self, buffer: &mut [u8]) -> ReadOutcome;
    fn cancel(&mut self);
    fn close(&mut self);
}
