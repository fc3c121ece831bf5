use crossbeam_channel::Receiver;
use tracing::{debug, info, instrument, warn};

use crate::scan_pipeline::calibration::{CalibrationStage, SampleDepth, WhiteReference};
use crate::scan_pipeline::common::error::{Result, ScanError};
use crate::scan_pipeline::delay::DelayBuffer;
use crate::scan_pipeline::device::ScanParameters;
use crate::scan_pipeline::minima::{TemporalMinima, find_significant_minima};
use crate::scan_pipeline::processing::config::PipelineConfig;
use crate::scan_pipeline::raster::OutputRaster;
use crate::scan_pipeline::source::{RawLine, ScanEvent, ScanSummary, StageTimings, Timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimumAxis {
    /// Dip between neighbouring pixels of the same line
    Spatial,
    /// Dip between the same column of consecutive lines
    Temporal,
}

/// A significant minimum found in the filtered signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minimum {
    /// Raster row of the line holding the minimum
    pub row: usize,
    /// Pixel index within the line
    pub pixel: usize,
    pub axis: MinimumAxis,
}

/// What a single `poll` did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PollReport {
    /// Lines calibrated and written during this poll
    pub processed: usize,
    /// Lines dropped by the delay buffer so far in this scan
    pub dropped: u64,
    /// Set when the scan finished and all buffered lines were flushed
    pub completed: Option<ScanSummary>,
}

/// Consumer side of a scan: takes lines from the acquisition channel, delays,
/// calibrates and filters them, looks for minima and assembles the raster.
pub struct LineProcessor {
    config: PipelineConfig,
    parameters: ScanParameters,
    events: Receiver<ScanEvent>,
    delay: DelayBuffer<RawLine>,
    calibration: CalibrationStage,
    temporal: TemporalMinima,
    raster: OutputRaster,
    minima: Vec<Minimum>,
    next_row: usize,
    rejected_rows: u64,
    timings: StageTimings,
    completion: Option<ScanSummary>,
    line_bytes: Vec<u8>,
}

impl LineProcessor {
    /// Builds the processing stages for lines shaped by `parameters`.
    ///
    /// Configuration problems, including lines that would not fit the
    /// raster at the configured column offset, are reported here rather than
    /// during the scan.
    pub fn new(
        config: PipelineConfig,
        parameters: ScanParameters,
        events: Receiver<ScanEvent>,
    ) -> Result<Self> {
        config.validate()?;
        let depth = SampleDepth::from_bits(parameters.depth)?;

        let fits = config
            .column_offset
            .checked_add(parameters.pixels_per_line)
            .is_some_and(|end| end <= config.raster_width);
        if !fits {
            return Err(ScanError::OutOfBounds {
                row: 0,
                col: config.column_offset,
                width: parameters.pixels_per_line,
                max_cols: config.raster_width,
                max_rows: config.raster_height,
            });
        }

        let delay = DelayBuffer::new(config.delay_depth, config.max_buffer_size)?;
        let calibration =
            CalibrationStage::new(parameters.samples_per_line(), depth, config.smoothing)?;
        let raster = OutputRaster::new(
            config.raster_width,
            config.raster_height,
            parameters.channels(),
        )?;

        Ok(Self {
            config,
            parameters,
            events,
            delay,
            calibration,
            temporal: TemporalMinima::new(),
            raster,
            minima: Vec::new(),
            next_row: 0,
            rejected_rows: 0,
            timings: StageTimings::new(),
            completion: None,
            line_bytes: Vec::new(),
        })
    }

    pub fn set_white_reference(&mut self, white: WhiteReference) -> Result<()> {
        self.calibration.set_white_reference(white)
    }

    /// Averages lines scanned from a white target into the white reference.
    pub fn capture_white_reference<'a, I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let depth = SampleDepth::from_bits(self.parameters.depth)?;
        let white =
            WhiteReference::from_lines(lines, depth, self.parameters.samples_per_line())?;
        self.calibration.set_white_reference(white)
    }

    /// Clears per-scan state: filter history, pending lines, minima and the
    /// raster. The white reference is kept.
    pub fn begin_scan(&mut self) {
        self.calibration.reset();
        self.temporal.reset();
        self.delay.clear();
        self.raster.clear();
        self.minima.clear();
        self.next_row = 0;
        self.rejected_rows = 0;
        self.timings.clear();
        self.completion = None;
    }

    /// Processes whatever the acquisition thread has delivered so far without
    /// blocking. At most `max_lines_per_poll` delayed lines are processed,
    /// except once the scan has completed, when the buffer is flushed.
    pub fn poll(&mut self) -> PollReport {
        let mut completed = None;
        while let Ok(event) = self.events.try_recv() {
            if let Some(summary) = self.accept(event) {
                completed = Some(summary);
                break;
            }
        }

        let mut processed = self.release_ready(self.config.max_lines_per_poll);
        if let Some(summary) = completed {
            processed += self.finish(summary);
        }

        PollReport {
            processed,
            dropped: self.delay.dropped(),
            completed,
        }
    }

    /// Blocks until the scan completes, processing lines as they arrive.
    #[instrument(skip(self))]
    pub fn run_to_completion(&mut self) -> Result<ScanSummary> {
        loop {
            let event = self
                .events
                .recv()
                .map_err(|_| ScanError::SourceDisconnected)?;
            if let Some(summary) = self.accept(event) {
                self.finish(summary);
                return Ok(summary);
            }
            self.release_ready(usize::MAX);
        }
    }

    fn accept(&mut self, event: ScanEvent) -> Option<ScanSummary> {
        match event {
            ScanEvent::LineAvailable(line) => {
                self.delay.enqueue(line);
                None
            }
            ScanEvent::ScanComplete(summary) => Some(summary),
        }
    }

    fn release_ready(&mut self, limit: usize) -> usize {
        let mut processed = 0;
        while processed < limit {
            let Some(line) = self.delay.release() else {
                break;
            };
            self.process_line(&line);
            processed += 1;
        }
        processed
    }

    fn finish(&mut self, summary: ScanSummary) -> usize {
        let pending: Vec<RawLine> = self.delay.drain().collect();
        let flushed = pending.len();
        for line in &pending {
            self.process_line(line);
        }

        self.completion = Some(summary);
        self.timings.log_summary();
        info!(
            rows = self.next_row,
            dropped = self.delay.dropped(),
            rejected = self.rejected_rows,
            minima = self.minima.len(),
            succeeded = summary.succeeded(),
            "Scan processed"
        );
        flushed
    }

    fn process_line(&mut self, line: &RawLine) {
        let row = self.next_row;
        self.next_row += 1;

        let timer = Timer::start("calibrate");
        let filtered = self.calibration.process(line.bytes());
        self.timings.record(timer);

        if self.config.detect_minima {
            let timer = Timer::start("minima");
            let channels = self.parameters.channels();
            let significance = self.config.significance;

            self.minima.extend(
                find_significant_minima(filtered, channels, significance)
                    .into_iter()
                    .map(|pixel| Minimum {
                        row,
                        pixel,
                        axis: MinimumAxis::Spatial,
                    }),
            );

            // Temporal hits belong to the line before this one.
            let mut temporal_pixels: Vec<usize> = self
                .temporal
                .push(filtered, significance)
                .into_iter()
                .map(|column| column / channels)
                .collect();
            temporal_pixels.dedup();
            if let Some(previous) = row.checked_sub(1) {
                self.minima
                    .extend(temporal_pixels.into_iter().map(|pixel| Minimum {
                        row: previous,
                        pixel,
                        axis: MinimumAxis::Temporal,
                    }));
            }
            self.timings.record(timer);
        }

        let timer = Timer::start("raster");
        self.calibration.filtered_bytes(&mut self.line_bytes);
        let written = self.raster.write_line(
            &self.line_bytes,
            row,
            self.config.column_offset,
            self.parameters.pixels_per_line,
        );
        self.timings.record(timer);

        if let Err(e) = written {
            if self.rejected_rows == 0 {
                warn!("Dropping lines that do not fit the raster: {}", e);
            }
            self.rejected_rows += 1;
        } else if row % 256 == 0 {
            debug!("Row {} written", row);
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn parameters(&self) -> &ScanParameters {
        &self.parameters
    }

    pub fn raster(&self) -> &OutputRaster {
        &self.raster
    }

    pub fn calibration(&self) -> &CalibrationStage {
        &self.calibration
    }

    pub fn minima(&self) -> &[Minimum] {
        &self.minima
    }

    /// Hands over the minima found since the last call. Long scans should
    /// call this after each `poll` to keep memory bounded.
    pub fn take_minima(&mut self) -> Vec<Minimum> {
        std::mem::take(&mut self.minima)
    }

    /// Lines processed so far in this scan, whether or not they fit the raster.
    pub fn rows_processed(&self) -> usize {
        self.next_row
    }

    /// Lines held back in the delay buffer.
    pub fn pending(&self) -> usize {
        self.delay.len()
    }

    pub fn dropped(&self) -> u64 {
        self.delay.dropped()
    }

    pub fn rejected_rows(&self) -> u64 {
        self.rejected_rows
    }

    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    pub fn completion(&self) -> Option<ScanSummary> {
        self.completion
    }
}
