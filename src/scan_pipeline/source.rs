//! Line acquisition module
//!
//! This module runs the blocking device read loop on its own thread and
//! hands each line to the consumer over a channel.

mod events;
mod line_source;
mod timing;


pub use events::{RawLine, ScanEvent, ScanOutcome, ScanSummary};
pub use line_source::{LineSource, SourceState};
pub use timing::{StageTiming, StageTimings, Timer};
