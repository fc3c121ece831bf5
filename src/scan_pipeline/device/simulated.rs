//! In-process line-scanning device.
//!
//! [`SimulatedDevice`] serves lines either from a fixed script or from a
//! channel fed by another thread, which lets callers control exactly when
//! each blocking read returns.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::trace;

use crate::scan_pipeline::common::error::{Result, ScanError};
use crate::scan_pipeline::device::control::{DeviceBackend, ScanDevice};
use crate::scan_pipeline::device::types::{
    Constraint, DeviceInfo, Fixed, OptionDescriptor, OptionValue, ReadOutcome, ScanParameters,
    ScanStatus, Unit, ValueType,
};

enum LineFeed {
    Scripted(VecDeque<Vec<u8>>),
    Channel(Receiver<Vec<u8>>),
}

/// Counters of the control calls a simulated device has received.
#[derive(Debug, Default)]
pub struct DeviceCalls {
    pub starts: AtomicUsize,
    pub reads: AtomicUsize,
    pub cancels: AtomicUsize,
    pub closes: AtomicUsize,
}

impl DeviceCalls {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct SimulatedDevice {
    parameters: ScanParameters,
    feed: LineFeed,
    options: Vec<(OptionDescriptor, OptionValue)>,
    start_status: ScanStatus,
    final_status: ScanStatus,
    line_delay: Option<Duration>,
    transferring: bool,
    calls: Arc<DeviceCalls>,
}

impl SimulatedDevice {
    /// A device that returns `lines` in order, then `EndOfFile`.
    pub fn scripted(parameters: ScanParameters, lines: Vec<Vec<u8>>) -> Self {
        Self::with_feed(parameters, LineFeed::Scripted(lines.into()))
    }

    /// A device whose reads block until a line arrives on `lines`. Dropping
    /// the sending side ends the scan with `EndOfFile`.
    pub fn fed(parameters: ScanParameters, lines: Receiver<Vec<u8>>) -> Self {
        Self::with_feed(parameters, LineFeed::Channel(lines))
    }

    fn with_feed(parameters: ScanParameters, feed: LineFeed) -> Self {
        Self {
            parameters,
            feed,
            options: default_options(),
            start_status: ScanStatus::Good,
            final_status: ScanStatus::EndOfFile,
            line_delay: None,
            transferring: false,
            calls: Arc::new(DeviceCalls::default()),
        }
    }

    /// Status returned once the line feed is exhausted.
    pub fn with_final_status(mut self, status: ScanStatus) -> Self {
        self.final_status = status;
        self
    }

    /// Status returned by `start`.
    pub fn with_start_status(mut self, status: ScanStatus) -> Self {
        self.start_status = status;
        self
    }

    /// Sleeps before every scripted line to mimic the sensor's line period.
    pub fn with_line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<DeviceCalls> {
        Arc::clone(&self.calls)
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        match &mut self.feed {
            LineFeed::Scripted(lines) => {
                if let Some(delay) = self.line_delay {
                    std::thread::sleep(delay);
                }
                lines.pop_front()
            }
            LineFeed::Channel(receiver) => receiver.recv().ok(),
        }
    }
}

impl ScanDevice for SimulatedDevice {
    fn option_count(&mut self) -> usize {
        self.options.len()
    }

    fn option_descriptor(&mut self, index: usize) -> Option<OptionDescriptor> {
        self.options.get(index).map(|(descriptor, _)| descriptor.clone())
    }

    fn get_option(&mut self, index: usize) -> Result<OptionValue> {
        self.options
            .get(index)
            .map(|(_, value)| value.clone())
            .ok_or(ScanError::device("get option", ScanStatus::InvalidArgument))
    }

    fn set_option(&mut self, index: usize, value: OptionValue) -> Result<()> {
        let (_, slot) = self
            .options
            .get_mut(index)
            .ok_or(ScanError::device("set option", ScanStatus::InvalidArgument))?;
        *slot = value;
        Ok(())
    }

    fn start(&mut self) -> ScanStatus {
        self.calls.starts.fetch_add(1, Ordering::SeqCst);
        self.transferring = self.start_status.is_good();
        self.start_status
    }

    fn parameters(&mut self) -> std::result::Result<ScanParameters, ScanStatus> {
        Ok(self.parameters)
    }

    fn read(&mut self, buffer: &mut [u8]) -> ReadOutcome {
        self.calls.reads.fetch_add(1, Ordering::SeqCst);
        if !self.transferring {
            return ReadOutcome::terminal(ScanStatus::Cancelled);
        }

        match self.next_line() {
            Some(line) => {
                let bytes = line.len().min(buffer.len());
                buffer[..bytes].copy_from_slice(&line[..bytes]);
                trace!("simulated read of {} bytes", bytes);
                ReadOutcome::good(bytes)
            }
            None => ReadOutcome::terminal(self.final_status),
        }
    }

    fn cancel(&mut self) {
        self.calls.cancels.fetch_add(1, Ordering::SeqCst);
        self.transferring = false;
    }

    fn close(&mut self) {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn default_options() -> Vec<(OptionDescriptor, OptionValue)> {
    vec![
        (
            OptionDescriptor {
                name: "mode".to_string(),
                title: "Scan mode".to_string(),
                value_type: ValueType::String,
                unit: Unit::None,
                size: 32,
                constraint: Constraint::StringList(vec![
                    "Color".to_string(),
                    "Gray".to_string(),
                    "Lineart".to_string(),
                ]),
            },
            OptionValue::Str("Gray".to_string()),
        ),
        (
            OptionDescriptor {
                name: "depth".to_string(),
                title: "Bit depth".to_string(),
                value_type: ValueType::Int,
                unit: Unit::Bit,
                size: 4,
                constraint: Constraint::WordList(vec![8, 16]),
            },
            OptionValue::Int(8),
        ),
        (
            OptionDescriptor {
                name: "resolution".to_string(),
                title: "Scan resolution".to_string(),
                value_type: ValueType::Int,
                unit: Unit::Dpi,
                size: 4,
                constraint: Constraint::WordList(vec![75, 150, 300, 600, 1200]),
            },
            OptionValue::Int(150),
        ),
        (
            OptionDescriptor {
                name: "br-x".to_string(),
                title: "Bottom-right x".to_string(),
                value_type: ValueType::Fixed,
                unit: Unit::Millimeter,
                size: 4,
                constraint: Constraint::Range {
                    min: 0,
                    max: Fixed::from_f64(215.9).0,
                    quant: 0,
                },
            },
            OptionValue::Fixed(Fixed::from_f64(215.9)),
        ),
    ]
}

/// A backend exposing a fixed set of simulated devices.
#[derive(Default)]
pub struct SimulatedBackend {
    devices: Vec<(DeviceInfo, Option<SimulatedDevice>)>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, name: impl Into<String>, device: SimulatedDevice) -> Self {
        let info = DeviceInfo {
            name: name.into(),
            vendor: "Simulated".to_string(),
            model: "Line scanner".to_string(),
            kind: "flatbed scanner".to_string(),
        };
        self.devices.push((info, Some(device)));
        self
    }
}

impl DeviceBackend for SimulatedBackend {
    type Device = SimulatedDevice;

    fn devices(&mut self) -> Result<Vec<DeviceInfo>> {
        Ok(self.devices.iter().map(|(info, _)| info.clone()).collect())
    }

    fn open(&mut self, name: &str) -> Result<SimulatedDevice> {
        let (_, slot) = self
            .devices
            .iter_mut()
            .find(|(info, _)| info.name == name)
            .ok_or(ScanError::device("open", ScanStatus::InvalidArgument))?;
        slot.take()
            .ok_or(ScanError::device("open", ScanStatus::DeviceBusy))
    }
}

/// Generates `count` lines of a test target: a horizontal ramp with a dark
/// band that drifts one pixel per line, and a brightness falloff towards the
/// edges that white calibration is expected to flatten.
pub fn test_pattern(parameters: &ScanParameters, count: usize) -> Vec<Vec<u8>> {
    let channels = parameters.channels();
    let pixels = parameters.pixels_per_line.max(1);
    let band_width = (pixels / 16).max(1);

    (0..count)
        .map(|line| {
            let band_start = (pixels / 4 + line) % pixels;
            let mut bytes = Vec::with_capacity(parameters.bytes_per_line);
            for x in 0..pixels {
                let falloff = 1.0 - 0.3 * ((x as f32 / pixels as f32) - 0.5).abs() * 2.0;
                let ramp = 160.0 + 80.0 * (x as f32 / pixels as f32);
                let in_band = x >= band_start && x < band_start + band_width;
                let level = if in_band { 40.0 } else { ramp * falloff };
                for channel in 0..channels {
                    let tint = 1.0 - 0.05 * channel as f32;
                    push_sample(&mut bytes, parameters.depth, level * tint);
                }
            }
            bytes.resize(parameters.bytes_per_line, 0);
            bytes
        })
        .collect()
}

/// Flat-field lines matching the falloff of [`test_pattern`], as a white
/// target would produce.
pub fn white_pattern(parameters: &ScanParameters, count: usize) -> Vec<Vec<u8>> {
    let channels = parameters.channels();
    let pixels = parameters.pixels_per_line.max(1);

    (0..count)
        .map(|_| {
            let mut bytes = Vec::with_capacity(parameters.bytes_per_line);
            for x in 0..pixels {
                let falloff = 1.0 - 0.3 * ((x as f32 / pixels as f32) - 0.5).abs() * 2.0;
                for channel in 0..channels {
                    let tint = 1.0 - 0.05 * channel as f32;
                    push_sample(&mut bytes, parameters.depth, 250.0 * falloff * tint);
                }
            }
            bytes.resize(parameters.bytes_per_line, 0);
            bytes
        })
        .collect()
}

fn push_sample(bytes: &mut Vec<u8>, depth: u32, level: f32) {
    let level = level.clamp(0.0, 255.0);
    if depth == 16 {
        bytes.extend_from_slice(&((level * 257.0) as u16).to_ne_bytes());
    } else {
        bytes.push(level as u8);
    }
}
