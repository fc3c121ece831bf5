use std::time::Duration;

use crossbeam_channel::Sender;

use crate::scan_pipeline::calibration::WhiteReference;
use crate::scan_pipeline::common::error::ScanError;
use crate::scan_pipeline::device::{
    DeviceSession, FrameFormat, ScanParameters, SimulatedBackend, SimulatedDevice,
};
use crate::scan_pipeline::processing::{LineProcessor, Minimum, MinimumAxis, PipelineConfig};
use crate::scan_pipeline::source::{LineSource, RawLine, ScanEvent, ScanOutcome, ScanSummary};

fn gray(pixels: usize) -> ScanParameters {
    ScanParameters {
        format: FrameFormat::Gray,
        depth: 8,
        lines: None,
        pixels_per_line: pixels,
        bytes_per_line: pixels,
    }
}

fn rgb(pixels: usize) -> ScanParameters {
    ScanParameters {
        format: FrameFormat::Rgb,
        depth: 8,
        lines: Some(3),
        pixels_per_line: pixels,
        bytes_per_line: pixels * 3,
    }
}

fn unfiltered(depth: usize) -> PipelineConfig {
    PipelineConfig::builder()
        .delay_depth(depth)
        .max_buffer_size(16)
        .smoothing(1.0)
        .raster_size(8, 8)
        .build()
}

fn completed(lines: u64) -> ScanEvent {
    ScanEvent::ScanComplete(ScanSummary {
        outcome: ScanOutcome::Completed,
        lines,
        elapsed: Duration::from_millis(1),
    })
}

fn send_lines(sender: &Sender<ScanEvent>, lines: &[&[u8]]) {
    for line in lines {
        sender
            .send(ScanEvent::LineAvailable(RawLine::copy_from(line)))
            .unwrap();
    }
}

#[test]
fn test_config_builder() {
    let config = PipelineConfig::builder()
        .delay_depth(6)
        .max_buffer_size(12)
        .smoothing(0.5)
        .significance(3.0)
        .detect_minima(false)
        .raster_size(100, 50)
        .column_offset(10)
        .max_lines_per_poll(4)
        .build();

    assert_eq!(config.delay_depth, 6);
    assert_eq!(config.max_buffer_size, 12);
    assert_eq!(config.smoothing, 0.5);
    assert_eq!(config.significance, 3.0);
    assert!(!config.detect_minima);
    assert_eq!((config.raster_width, config.raster_height), (100, 50));
    assert_eq!(config.column_offset, 10);
    assert_eq!(config.max_lines_per_poll, 4);
    assert!(config.validate().is_ok());
    assert!(PipelineConfig::default().validate().is_ok());
}

#[test]
fn test_invalid_config_rejected_at_setup() {
    let (_tx, rx) = crossbeam_channel::unbounded();
    let invalid = [
        PipelineConfig::builder().delay_depth(0).build(),
        PipelineConfig::builder().delay_depth(8).max_buffer_size(4).build(),
        PipelineConfig::builder().smoothing(0.0).build(),
        PipelineConfig::builder().significance(0.0).build(),
        PipelineConfig::builder().max_lines_per_poll(0).build(),
    ];
    for config in invalid {
        let result = LineProcessor::new(config, gray(4), rx.clone());
        assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
    }
}

#[test]
fn test_unsupported_depth_rejected() {
    let (_tx, rx) = crossbeam_channel::unbounded();
    let parameters = ScanParameters { depth: 1, ..gray(8) };
    let result = LineProcessor::new(unfiltered(1), parameters, rx);
    assert!(matches!(result, Err(ScanError::UnsupportedDepth(1))));
}

#[test]
fn test_line_wider_than_raster_rejected_at_setup() {
    let (_tx, rx) = crossbeam_channel::unbounded();
    let config = PipelineConfig::builder()
        .raster_size(8, 8)
        .column_offset(4)
        .build();
    let result = LineProcessor::new(config, gray(5), rx);
    assert!(matches!(result, Err(ScanError::OutOfBounds { col: 4, width: 5, .. })));
}

#[test]
fn test_white_reference_length_checked() {
    let (_tx, rx) = crossbeam_channel::unbounded();
    let mut processor = LineProcessor::new(unfiltered(1), rgb(2), rx).unwrap();
    let result = processor.set_white_reference(WhiteReference::new(vec![255.0; 2]));
    assert!(matches!(
        result,
        Err(ScanError::WhiteReferenceLength {
            expected: 6,
            actual: 2
        })
    ));
}

#[test]
fn test_delay_then_flush_on_completion() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut processor = LineProcessor::new(unfiltered(3), gray(2), rx).unwrap();

    send_lines(&tx, &[&[1, 1], &[2, 2], &[3, 3], &[4, 4], &[5, 5]]);
    let report = processor.poll();
    assert_eq!(report.processed, 3);
    assert_eq!(report.completed, None);
    assert_eq!(processor.pending(), 2);
    assert_eq!(processor.raster().row(0).unwrap()[..2], [1, 1]);
    assert_eq!(processor.raster().row(2).unwrap()[..2], [3, 3]);
    assert_eq!(processor.raster().row(3).unwrap()[..2], [0, 0]);

    tx.send(completed(5)).unwrap();
    let report = processor.poll();
    assert_eq!(report.processed, 2);
    assert!(report.completed.unwrap().succeeded());
    assert_eq!(processor.pending(), 0);
    assert_eq!(processor.rows_processed(), 5);
    assert_eq!(processor.raster().row(4).unwrap()[..2], [5, 5]);
}

#[test]
fn test_poll_processes_bounded_batches() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let config = PipelineConfig {
        max_lines_per_poll: 2,
        ..unfiltered(1)
    };
    let mut processor = LineProcessor::new(config, gray(1), rx).unwrap();

    send_lines(&tx, &[&[1], &[2], &[3], &[4], &[5]]);
    assert_eq!(processor.poll().processed, 2);
    assert_eq!(processor.poll().processed, 2);
    assert_eq!(processor.poll().processed, 1);
    assert_eq!(processor.poll().processed, 0);
    assert_eq!(processor.dropped(), 0);
}

#[test]
fn test_overflow_drops_oldest_lines() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let config = PipelineConfig {
        max_buffer_size: 2,
        max_lines_per_poll: 1,
        ..unfiltered(1)
    };
    let mut processor = LineProcessor::new(config, gray(1), rx).unwrap();

    send_lines(&tx, &[&[1], &[2], &[3], &[4], &[5]]);
    let report = processor.poll();

    assert_eq!(report.processed, 1);
    assert_eq!(report.dropped, 3);
    assert_eq!(processor.raster().pixel(0, 0), Some(&[4][..]));
}

#[test]
fn test_rows_past_raster_height_counted() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let config = PipelineConfig::builder()
        .delay_depth(1)
        .smoothing(1.0)
        .raster_size(1, 2)
        .build();
    let mut processor = LineProcessor::new(config, gray(1), rx).unwrap();

    send_lines(&tx, &[&[1], &[2], &[3], &[4]]);
    tx.send(completed(4)).unwrap();
    processor.poll();

    assert_eq!(processor.rows_processed(), 4);
    assert_eq!(processor.rejected_rows(), 2);
    assert_eq!(processor.raster().as_bytes(), &[1, 2]);
}

#[test]
fn test_white_calibration_applied() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut processor = LineProcessor::new(unfiltered(1), gray(2), rx).unwrap();
    let white: [&[u8]; 2] = [&[200, 100], &[200, 100]];
    processor.capture_white_reference(white).unwrap();

    send_lines(&tx, &[&[100, 100]]);
    processor.poll();

    assert_eq!(processor.raster().row(0).unwrap()[..2], [128, 255]);
}

#[test]
fn test_minima_detected() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let config = PipelineConfig {
        significance: 20.0,
        ..unfiltered(1)
    };
    let mut processor = LineProcessor::new(config, gray(3), rx).unwrap();

    send_lines(
        &tx,
        &[&[200, 100, 200], &[200, 200, 200], &[200, 200, 200], &[100, 200, 200], &[200, 200, 200]],
    );
    processor.poll();

    let minima = processor.minima();
    assert!(minima.contains(&Minimum {
        row: 0,
        pixel: 1,
        axis: MinimumAxis::Spatial
    }));
    assert!(minima.contains(&Minimum {
        row: 3,
        pixel: 0,
        axis: MinimumAxis::Temporal
    }));
    assert_eq!(minima.len(), 2);
}

#[test]
fn test_begin_scan_resets_state() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut processor = LineProcessor::new(unfiltered(2), gray(1), rx).unwrap();

    send_lines(&tx, &[&[9], &[9], &[9]]);
    tx.send(completed(3)).unwrap();
    processor.poll();
    assert!(processor.completion().is_some());

    processor.begin_scan();
    assert_eq!(processor.rows_processed(), 0);
    assert_eq!(processor.pending(), 0);
    assert!(processor.completion().is_none());
    assert!(processor.raster().as_bytes().iter().all(|&b| b == 0));
    assert_eq!(processor.calibration().lines_processed(), 0);
}

#[test]
fn test_disconnected_source() {
    let (tx, rx) = crossbeam_channel::unbounded::<ScanEvent>();
    let mut processor = LineProcessor::new(unfiltered(1), gray(1), rx).unwrap();
    drop(tx);
    assert!(matches!(
        processor.run_to_completion(),
        Err(ScanError::SourceDisconnected)
    ));
}

#[test]
fn test_end_to_end_scan() {
    let lines = vec![
        vec![10, 20, 30, 40, 50, 60],
        vec![11, 21, 31, 41, 51, 61],
        vec![12, 22, 32, 42, 52, 62],
    ];
    let mut backend = SimulatedBackend::new()
        .with_device("sim:0", SimulatedDevice::scripted(rgb(2), lines.clone()));
    let mut session = DeviceSession::open_first(&mut backend).unwrap();
    let parameters = session.parameters().unwrap();

    let (mut source, events) = LineSource::new(session);
    let mut processor = LineProcessor::new(unfiltered(2), parameters, events).unwrap();

    source.start().unwrap();
    let summary = processor.run_to_completion().unwrap();
    source.wait().unwrap();

    assert!(summary.succeeded());
    assert_eq!(summary.lines, 3);
    assert_eq!(processor.rows_processed(), 3);
    for (row, line) in lines.iter().enumerate() {
        assert_eq!(&processor.raster().row(row).unwrap()[..6], line.as_slice());
    }
}

#[test]
fn test_take_minima_drains_between_polls() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut processor = LineProcessor::new(unfiltered(1), gray(3), rx).unwrap();

    send_lines(&tx, &[&[200, 100, 200]]);
    processor.poll();
    assert_eq!(
        processor.take_minima(),
        vec![Minimum {
            row: 0,
            pixel: 1,
            axis: MinimumAxis::Spatial
        }]
    );
    assert!(processor.minima().is_empty());

    send_lines(&tx, &[&[200, 100, 200]]);
    processor.poll();
    let taken = processor.take_minima();
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0].row, 1);
}
