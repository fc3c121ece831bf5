use std::time::Duration;

use linescan_rs::logger;
use linescan_rs::scan_pipeline::device::simulated::{test_pattern, white_pattern};
use linescan_rs::scan_pipeline::device::FrameFormat;
use linescan_rs::scan_pipeline::{
    DeviceSession, DeviceSettings, LineProcessor, LineSource, MinimumAxis, PipelineConfig,
    ScanParameters, SimulatedBackend, SimulatedDevice,
};

use tracing::{error, info, warn};

const DEMO_LINES: usize = 600;

fn main() -> anyhow::Result<()> {
    logger::init();

    info!("Starting line scan...");

    let parameters = ScanParameters {
        format: FrameFormat::Rgb,
        depth: 8,
        lines: Some(DEMO_LINES),
        pixels_per_line: 2539,
        bytes_per_line: 2539 * 3,
    };
    let device = SimulatedDevice::scripted(parameters, test_pattern(&parameters, DEMO_LINES))
        .with_line_delay(Duration::from_micros(200));
    let mut backend = SimulatedBackend::new().with_device("sim:flatbed", device);

    let mut session = DeviceSession::open_first(&mut backend)?;
    DeviceSettings::default().apply(&mut session)?;
    let parameters = session.parameters()?;

    let config = PipelineConfig::builder()
        .delay_depth(8)
        .smoothing(0.25)
        .significance(30.0)
        .build();

    let (mut source, events) = LineSource::new(session);
    let mut processor = LineProcessor::new(config, parameters, events)?;

    let white = white_pattern(&parameters, 4);
    processor.capture_white_reference(white.iter().map(Vec::as_slice))?;

    info!(
        "Scanning {} lines of {} pixels",
        DEMO_LINES, parameters.pixels_per_line
    );
    source.start()?;

    let (mut edges, mut temporal) = (0usize, 0usize);
    let summary = loop {
        let report = processor.poll();
        for minimum in processor.take_minima() {
            match minimum.axis {
                MinimumAxis::Spatial => edges += 1,
                MinimumAxis::Temporal => temporal += 1,
            }
        }
        if let Some(summary) = report.completed {
            break summary;
        }
        std::thread::sleep(Duration::from_millis(16));
    };
    source.wait()?;

    if summary.succeeded() {
        info!(
            "Scan complete: {} lines at {:.1} lines/s",
            summary.lines,
            summary.lines_per_second()
        );
    } else {
        error!("Scan ended early: {:?}", summary.outcome);
    }
    if processor.dropped() > 0 {
        warn!("{} lines dropped by the delay buffer", processor.dropped());
    }

    info!(
        rows = processor.rows_processed(),
        edges,
        temporal,
        "Raster assembled ({}x{})",
        processor.raster().width(),
        processor.raster().height()
    );

    Ok(())
}
