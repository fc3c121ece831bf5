//! Types exchanged with the device control collaborator

use std::fmt;

/// Status codes reported by the device for every control and read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanStatus {
    Good,
    Unsupported,
    Cancelled,
    DeviceBusy,
    InvalidArgument,
    EndOfFile,
    Jammed,
    NoDocuments,
    CoverOpen,
    IoError,
    NoMemory,
    AccessDenied,
}

impl ScanStatus {
    pub fn is_good(self) -> bool {
        self == ScanStatus::Good
    }

    /// Human readable description, as shown in scan logs.
    pub fn description(self) -> &'static str {
        match self {
            ScanStatus::Good => "Success",
            ScanStatus::Unsupported => "Operation not supported",
            ScanStatus::Cancelled => "Operation was cancelled",
            ScanStatus::DeviceBusy => "Device busy",
            ScanStatus::InvalidArgument => "Invalid argument",
            ScanStatus::EndOfFile => "End of file reached",
            ScanStatus::Jammed => "Document feeder jammed",
            ScanStatus::NoDocuments => "Document feeder out of documents",
            ScanStatus::CoverOpen => "Scanner cover is open",
            ScanStatus::IoError => "Error during device I/O",
            ScanStatus::NoMemory => "Out of memory",
            ScanStatus::AccessDenied => "Access to resource has been denied",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Result of a single blocking line read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Number of bytes actually written into the caller's buffer
    pub bytes: usize,
    pub status: ScanStatus,
}

impl ReadOutcome {
    pub fn good(bytes: usize) -> Self {
        Self {
            bytes,
            status: ScanStatus::Good,
        }
    }

    pub fn terminal(status: ScanStatus) -> Self {
        Self { bytes: 0, status }
    }
}

/// Layout of the samples in each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Gray,
    /// Interleaved red, green, blue samples
    Rgb,
}

impl FrameFormat {
    pub fn channels(self) -> usize {
        match self {
            FrameFormat::Gray => 1,
            FrameFormat::Rgb => 3,
        }
    }
}

/// Scan parameters negotiated with the device for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    pub format: FrameFormat,
    /// Bits per sample
    pub depth: u32,
    /// Total number of lines, `None` when the device cannot tell in advance
    pub lines: Option<usize>,
    pub pixels_per_line: usize,
    pub bytes_per_line: usize,
}

impl ScanParameters {
    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    /// Number of samples (pixels × channels) in one line.
    pub fn samples_per_line(&self) -> usize {
        self.pixels_per_line * self.channels()
    }
}

/// Identification of a device as returned by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub model: String,
    pub kind: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name = {} vendor = {} model = {} type = {}",
            self.name, self.vendor, self.model, self.kind
        )
    }
}

/// 16.16 fixed point value used by device options expressed in real units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed(pub i32);

impl Fixed {
    const SHIFT: u32 = 16;

    pub fn from_f64(value: f64) -> Self {
        Fixed((value * f64::from(1u32 << Self::SHIFT)).round() as i32)
    }

    /// Saturates at the bounds of the 16.16 range.
    pub fn from_int(value: i32) -> Self {
        Fixed(value.saturating_mul(1 << Self::SHIFT))
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(1u32 << Self::SHIFT)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Fixed,
    String,
    Button,
    Group,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Fixed => "fixed",
            ValueType::String => "string",
            ValueType::Button => "button",
            ValueType::Group => "group",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    Pixel,
    Bit,
    Millimeter,
    Dpi,
    Percent,
    Microsecond,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unit::None => "unitless",
            Unit::Pixel => "pixel",
            Unit::Bit => "bits",
            Unit::Millimeter => "millimeters",
            Unit::Dpi => "dpi",
            Unit::Percent => "percent",
            Unit::Microsecond => "microseconds",
        })
    }
}

/// Typed value of a device option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i32),
    Fixed(Fixed),
    Str(String),
}

impl OptionValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            OptionValue::Bool(_) => ValueType::Bool,
            OptionValue::Int(_) => ValueType::Int,
            OptionValue::Fixed(_) => ValueType::Fixed,
            OptionValue::Str(_) => ValueType::String,
        }
    }

    /// Numeric view of int and fixed values, in the integer domain the
    /// device uses for range and word-list constraints.
    fn word(&self) -> Option<i32> {
        match self {
            OptionValue::Int(v) => Some(*v),
            OptionValue::Fixed(v) => Some(v.0),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(v) => write!(f, "{v}"),
            OptionValue::Int(v) => write!(f, "{v}"),
            OptionValue::Fixed(v) => write!(f, "{v}"),
            OptionValue::Str(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    None,
    Range { min: i32, max: i32, quant: i32 },
    WordList(Vec<i32>),
    StringList(Vec<String>),
}

impl Constraint {
    /// Checks a value against the constraint, returning the reason on failure.
    pub fn check(&self, value: &OptionValue) -> Result<(), String> {
        match self {
            Constraint::None => Ok(()),
            Constraint::Range { min, max, quant } => {
                let word = value
                    .word()
                    .ok_or_else(|| format!("{} value is not numeric", value.value_type()))?;
                if word < *min || word > *max {
                    return Err(format!("{word} outside {min} to {max}"));
                }
                if *quant != 0 && (i64::from(word) - i64::from(*min)) % i64::from(*quant) != 0 {
                    return Err(format!("{word} is not a multiple of {quant} from {min}"));
                }
                Ok(())
            }
            Constraint::WordList(words) => {
                let word = value
                    .word()
                    .ok_or_else(|| format!("{} value is not numeric", value.value_type()))?;
                if words.contains(&word) {
                    Ok(())
                } else {
                    Err(format!("{word} not in {words:?}"))
                }
            }
            Constraint::StringList(strings) => match value {
                OptionValue::Str(s) if strings.iter().any(|c| c == s) => Ok(()),
                OptionValue::Str(s) => Err(format!("'{s}' not in {strings:?}")),
                other => Err(format!("{} value where a string is expected", other.value_type())),
            },
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::None => f.write_str("any value"),
            Constraint::StringList(_) => f.write_str("{string list...}"),
            Constraint::WordList(_) => f.write_str("{word list...}"),
            Constraint::Range { min, max, quant } => {
                write!(f, "{min} to {max}")?;
                if *quant != 0 {
                    write!(f, " in {quant}")?;
                }
                Ok(())
            }
        }
    }
}

/// Description of one device option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    pub name: String,
    pub title: String,
    pub value_type: ValueType,
    pub unit: Unit,
    pub size: usize,
    pub constraint: Constraint,
}

impl fmt::Display for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{})[{}] {}",
            self.title, self.value_type, self.unit, self.size, self.constraint
        )
    }
}
