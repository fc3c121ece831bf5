//! Device control module
//!
//! This module defines the narrow interface through which the pipeline talks
//! to a line-scanning device, scoped session handling, and scan settings.

mod control;
mod session;
mod settings;
pub mod simulated;
pub mod types;


pub use control::{DeviceBackend, ScanDevice};
pub use session::DeviceSession;
pub(crate) use session::log_status;
pub use settings::{DeviceSettings, DeviceSettingsBuilder};
pub use simulated::{DeviceCalls, SimulatedBackend, SimulatedDevice};
pub use types::{
    Constraint, DeviceInfo, Fixed, FrameFormat, OptionDescriptor, OptionValue, ReadOutcome,
    ScanParameters, ScanStatus, Unit, ValueType,
};
