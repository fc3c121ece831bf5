use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, info_span, warn};

use crate::scan_pipeline::common::error::{Result, ScanError};
use crate::scan_pipeline::device::{DeviceSession, ScanDevice, ScanParameters, ScanStatus, log_status};
use crate::scan_pipeline::source::events::{RawLine, ScanEvent, ScanOutcome, ScanSummary};
use crate::scan_pipeline::source::timing::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Idle,
    Scanning,
    /// A stop was requested and the in-flight read has not returned yet
    Stopping,
}

/// Everything the acquisition thread needs exclusive access to. It travels to
/// the thread on `start` and comes back when the thread is joined.
struct Worker<D: ScanDevice> {
    session: DeviceSession<D>,
    buffer: Vec<u8>,
}

/// Reads lines from a device on a background thread and publishes them as
/// [`ScanEvent`]s.
///
/// Dropping the source stops the scan, joins the thread and closes the device.
pub struct LineSource<D: ScanDevice> {
    worker: Option<Worker<D>>,
    handle: Option<JoinHandle<(Worker<D>, ScanSummary)>>,
    stop_requested: Arc<AtomicBool>,
    parameters: Arc<Mutex<Option<ScanParameters>>>,
    events: Sender<ScanEvent>,
    last_summary: Option<ScanSummary>,
}

impl<D: ScanDevice> LineSource<D> {
    /// Creates a source for `session`, returning the receiving end of its
    /// event channel.
    pub fn new(session: DeviceSession<D>) -> (Self, Receiver<ScanEvent>) {
        Self::with_session(Some(session))
    }

    /// Creates a source with no device attached; `start` reports
    /// [`ScanError::NoDevice`].
    pub fn detached() -> (Self, Receiver<ScanEvent>) {
        Self::with_session(None)
    }

    fn with_session(session: Option<DeviceSession<D>>) -> (Self, Receiver<ScanEvent>) {
        let (events, receiver) = crossbeam_channel::unbounded();
        let source = Self {
            worker: session.map(|session| Worker {
                session,
                buffer: Vec::new(),
            }),
            handle: None,
            stop_requested: Arc::new(AtomicBool::new(false)),
            parameters: Arc::new(Mutex::new(None)),
            events,
            last_summary: None,
        };
        (source, receiver)
    }

    /// Starts acquisition on a background thread. A previous run is stopped
    /// and joined first.
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            self.stop();
            self.wait()?;
        }

        let worker = self.worker.take().ok_or(ScanError::NoDevice)?;
        self.stop_requested.store(false, Ordering::SeqCst);

        let stop = Arc::clone(&self.stop_requested);
        let parameters = Arc::clone(&self.parameters);
        let events = self.events.clone();
        let handle = std::thread::Builder::new()
            .name("line-source".to_string())
            .spawn(move || read_loop(worker, &stop, &events, &parameters))
            .map_err(|e| ScanError::ThreadSpawn(e.to_string()))?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Requests the acquisition thread to stop after its current read.
    /// Does nothing when no scan is running.
    pub fn stop(&self) {
        if self.state() == SourceState::Scanning {
            info!("Stop requested");
            self.stop_requested.store(true, Ordering::SeqCst);
        }
    }

    pub fn state(&self) -> SourceState {
        match &self.handle {
            None => SourceState::Idle,
            Some(handle) if handle.is_finished() => SourceState::Idle,
            Some(_) if self.stop_requested.load(Ordering::SeqCst) => SourceState::Stopping,
            Some(_) => SourceState::Scanning,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.state() != SourceState::Idle
    }

    /// Blocks until the acquisition thread exits and returns the summary of
    /// the run, or `None` when no run was pending.
    pub fn wait(&mut self) -> Result<Option<ScanSummary>> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        let (worker, summary) = handle.join().map_err(|_| ScanError::WorkerPanicked)?;
        self.worker = Some(worker);
        self.last_summary = Some(summary);
        Ok(Some(summary))
    }

    pub fn last_summary(&self) -> Option<ScanSummary> {
        self.last_summary
    }

    /// The device session, available while no scan is running.
    pub fn session_mut(&mut self) -> Option<&mut DeviceSession<D>> {
        self.worker.as_mut().map(|worker| &mut worker.session)
    }

    /// Parameters negotiated at the start of the most recent scan.
    pub fn parameters(&self) -> Option<ScanParameters> {
        match self.parameters.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn bytes_per_line(&self) -> usize {
        self.parameters().map_or(0, |p| p.bytes_per_line)
    }

    pub fn pixels_per_line(&self) -> usize {
        self.parameters().map_or(0, |p| p.pixels_per_line)
    }

    pub fn total_lines(&self) -> Option<usize> {
        self.parameters().and_then(|p| p.lines)
    }
}

impl<D: ScanDevice> Drop for LineSource<D> {
    fn drop(&mut self) {
        self.stop();
        if let Err(e) = self.wait() {
            warn!("Line source shut down uncleanly: {}", e);
        }
    }
}

fn read_loop<D: ScanDevice>(
    mut worker: Worker<D>,
    stop: &AtomicBool,
    events: &Sender<ScanEvent>,
    parameters: &Mutex<Option<ScanParameters>>,
) -> (Worker<D>, ScanSummary) {
    let span = info_span!("scan", device = %worker.session.info().name);
    let _guard = span.enter();

    info!("Starting scan...");
    let timer = Timer::start("scan");
    let mut lines = 0u64;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        acquire(&mut worker, stop, events, parameters, &mut lines)
    }))
    .unwrap_or_else(|_| {
        error!("Device panicked during scan");
        ScanOutcome::Failed(ScanStatus::IoError)
    });
    worker.session.end();

    let (_, elapsed) = timer.stop();
    let summary = ScanSummary {
        outcome,
        lines,
        elapsed,
    };
    info!(
        lines,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        lines_per_second = summary.lines_per_second(),
        "Scan finished: {:?}",
        outcome
    );

    if events.send(ScanEvent::ScanComplete(summary)).is_err() {
        debug!("No receiver for scan completion");
    }
    (worker, summary)
}

fn acquire<D: ScanDevice>(
    worker: &mut Worker<D>,
    stop: &AtomicBool,
    events: &Sender<ScanEvent>,
    shared_parameters: &Mutex<Option<ScanParameters>>,
    lines: &mut u64,
) -> ScanOutcome {
    let status = worker.session.begin();
    log_status("start", status);
    if !status.is_good() {
        return ScanOutcome::Failed(status);
    }

    let parameters = match worker.session.scan_parameters() {
        Ok(parameters) => parameters,
        Err(status) => {
            log_status("get parameters", status);
            return ScanOutcome::Failed(status);
        }
    };
    debug!(
        depth = parameters.depth,
        lines = ?parameters.lines,
        pixels_per_line = parameters.pixels_per_line,
        bytes_per_line = parameters.bytes_per_line,
        "Scan parameters"
    );
    match shared_parameters.lock() {
        Ok(mut guard) => *guard = Some(parameters),
        Err(poisoned) => *poisoned.into_inner() = Some(parameters),
    }

    if parameters.bytes_per_line == 0 {
        warn!("Device reported zero bytes per line");
        return ScanOutcome::Failed(ScanStatus::InvalidArgument);
    }
    if worker.buffer.len() != parameters.bytes_per_line {
        worker.buffer.resize(parameters.bytes_per_line, 0);
    }

    loop {
        if stop.load(Ordering::SeqCst) {
            return ScanOutcome::Stopped;
        }

        let read = worker.session.read(&mut worker.buffer);
        if !read.status.is_good() {
            log_status("final status", read.status);
            return match read.status {
                ScanStatus::EndOfFile => ScanOutcome::Completed,
                ScanStatus::Cancelled if stop.load(Ordering::SeqCst) => ScanOutcome::Stopped,
                status => ScanOutcome::Failed(status),
            };
        }

        if stop.load(Ordering::SeqCst) {
            debug!("Discarding line read after stop request");
            return ScanOutcome::Stopped;
        }
        if read.bytes == 0 {
            continue;
        }

        let bytes = read.bytes.min(worker.buffer.len());
        let line = RawLine::copy_from(&worker.buffer[..bytes]);
        if events.send(ScanEvent::LineAvailable(line)).is_err() {
            warn!("Event receiver dropped, ending scan");
            return ScanOutcome::Stopped;
        }
        *lines += 1;
    }
}
