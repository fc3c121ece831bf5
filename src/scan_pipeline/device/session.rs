//! Scoped ownership of an open device.
//!
//! A [`DeviceSession`] cancels any transfer in progress and closes the device
//! when dropped, whichever path the scan ends on.

use tracing::{debug, info, warn};

use crate::scan_pipeline::common::error::{Result, ScanError};
use crate::scan_pipeline::device::control::{DeviceBackend, ScanDevice};
use crate::scan_pipeline::device::types::{
    DeviceInfo, OptionDescriptor, OptionValue, ReadOutcome, ScanParameters, ScanStatus,
};

pub struct DeviceSession<D: ScanDevice> {
    device: D,
    info: DeviceInfo,
}

impl<D: ScanDevice> DeviceSession<D> {
    /// Enumerates devices on `backend` and opens the first one found.
    pub fn open_first<B>(backend: &mut B) -> Result<Self>
    where
        B: DeviceBackend<Device = D>,
    {
        let devices = backend.devices()?;
        for device in &devices {
            debug!("device: {}", device);
        }
        info!("Found {} devices total", devices.len());

        let info = devices.into_iter().next().ok_or(ScanError::NoDevice)?;
        debug!("Opening {}", info.name);
        let device = backend.open(&info.name)?;

        let mut session = Self { device, info };
        session.log_descriptors();
        Ok(session)
    }

    /// Wraps an already opened device.
    pub fn from_device(device: D, info: DeviceInfo) -> Self {
        Self { device, info }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn descriptors(&mut self) -> Vec<(usize, OptionDescriptor)> {
        (0..self.device.option_count())
            .filter_map(|index| {
                self.device
                    .option_descriptor(index)
                    .map(|descriptor| (index, descriptor))
            })
            .collect()
    }

    fn log_descriptors(&mut self) {
        let descriptors = self.descriptors();
        debug!("{} descriptors total", descriptors.len());
        for (index, descriptor) in descriptors {
            debug!("{}: {}", index, descriptor);
        }
    }

    pub fn find_option(&mut self, name: &str) -> Option<(usize, OptionDescriptor)> {
        self.descriptors()
            .into_iter()
            .find(|(_, descriptor)| descriptor.name == name)
    }

    pub fn get_option(&mut self, name: &str) -> Result<Option<OptionValue>> {
        match self.find_option(name) {
            Some((index, _)) => self.device.get_option(index).map(Some),
            None => Ok(None),
        }
    }

    /// Sets a named option after checking the value against the option's
    /// type and constraint. Returns `false` when the device has no such
    /// option.
    pub fn set_option(&mut self, name: &str, value: OptionValue) -> Result<bool> {
        let Some((index, descriptor)) = self.find_option(name) else {
            return Ok(false);
        };

        if descriptor.value_type != value.value_type() {
            return Err(ScanError::InvalidOption {
                name: name.to_string(),
                reason: format!(
                    "expected {} value, got {}",
                    descriptor.value_type,
                    value.value_type()
                ),
            });
        }
        descriptor
            .constraint
            .check(&value)
            .map_err(|reason| ScanError::InvalidOption {
                name: name.to_string(),
                reason,
            })?;

        debug!("setting {} to {}", name, value);
        self.device.set_option(index, value)?;
        Ok(true)
    }

    /// Parameters the device currently expects to use for the next scan.
    pub fn parameters(&mut self) -> Result<ScanParameters> {
        self.device
            .parameters()
            .map_err(|status| ScanError::device("get parameters", status))
    }

    pub(crate) fn begin(&mut self) -> ScanStatus {
        self.device.start()
    }

    pub(crate) fn scan_parameters(&mut self) -> std::result::Result<ScanParameters, ScanStatus> {
        self.device.parameters()
    }

    pub(crate) fn read(&mut self, buffer: &mut [u8]) -> ReadOutcome {
        self.device.read(buffer)
    }

    pub(crate) fn end(&mut self) {
        self.device.cancel();
    }
}

impl<D: ScanDevice> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        info!("Closing device {}", self.info.name);
        self.device.cancel();
        self.device.close();
    }
}

impl<D: ScanDevice> std::fmt::Debug for DeviceSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Logs the outcome of a device call the way scan logs report statuses.
pub(crate) fn log_status(context: &str, status: ScanStatus) {
    if status.is_good() {
        debug!("{}: {}", context, status);
    } else {
        warn!("{}: {}", context, status);
    }
}
