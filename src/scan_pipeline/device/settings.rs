//! Device scan settings

use tracing::{info, instrument, warn};

use crate::scan_pipeline::common::error::Result;
use crate::scan_pipeline::device::control::ScanDevice;
use crate::scan_pipeline::device::session::DeviceSession;
use crate::scan_pipeline::device::types::{Fixed, OptionValue};

pub const MODE_OPTION: &str = "mode";
pub const RESOLUTION_OPTION: &str = "resolution";
pub const DEPTH_OPTION: &str = "depth";
pub const SCAN_WIDTH_OPTION: &str = "br-x";

/// Settings pushed to the device before a scan starts.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettings {
    /// Colour mode, e.g. "Color" or "Gray"
    pub mode: String,
    /// Resolution in dots per inch
    pub resolution: i32,
    /// Bits per sample
    pub depth: i32,
    /// Width of the scan area in millimetres, `None` keeps the device default
    pub scan_width_mm: Option<f64>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            mode: "Color".to_string(),
            resolution: 300,
            depth: 8,
            scan_width_mm: Some(215.0),
        }
    }
}

impl DeviceSettings {
    pub fn builder() -> DeviceSettingsBuilder {
        DeviceSettingsBuilder::default()
    }

    /// Applies every setting to the session's device. Options the device
    /// does not expose are skipped with a warning; values outside an option's
    /// constraint fail.
    #[instrument(skip(self, session), fields(device = %session.info().name))]
    pub fn apply<D: ScanDevice>(&self, session: &mut DeviceSession<D>) -> Result<()> {
        let values = [
            (MODE_OPTION, Some(OptionValue::Str(self.mode.clone()))),
            (RESOLUTION_OPTION, Some(OptionValue::Int(self.resolution))),
            (DEPTH_OPTION, Some(OptionValue::Int(self.depth))),
            (
                SCAN_WIDTH_OPTION,
                self.scan_width_mm.map(|mm| OptionValue::Fixed(Fixed::from_f64(mm))),
            ),
        ];

        for (name, value) in values {
            let Some(value) = value else { continue };
            if !session.set_option(name, value)? {
                warn!("Device has no '{}' option, skipping", name);
            }
        }

        info!(
            mode = %self.mode,
            resolution = self.resolution,
            depth = self.depth,
            "Device configured"
        );
        Ok(())
    }
}

/// Builder for DeviceSettings
#[derive(Default)]
pub struct DeviceSettingsBuilder {
    mode: Option<String>,
    resolution: Option<i32>,
    depth: Option<i32>,
    scan_width_mm: Option<Option<f64>>,
}

impl DeviceSettingsBuilder {
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn resolution(mut self, dpi: i32) -> Self {
        self.resolution = Some(dpi);
        self
    }

    pub fn depth(mut self, depth: i32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn scan_width_mm(mut self, width: Option<f64>) -> Self {
        self.scan_width_mm = Some(width);
        self
    }

    pub fn build(self) -> DeviceSettings {
        let default = DeviceSettings::default();
        DeviceSettings {
            mode: self.mode.unwrap_or(default.mode),
            resolution: self.resolution.unwrap_or(default.resolution),
            depth: self.depth.unwrap_or(default.depth),
            scan_width_mm: self.scan_width_mm.unwrap_or(default.scan_width_mm),
        }
    }
}
