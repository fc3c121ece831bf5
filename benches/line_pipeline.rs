use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use linescan_rs::scan_pipeline::device::FrameFormat;
use linescan_rs::scan_pipeline::device::simulated::{test_pattern, white_pattern};
use linescan_rs::scan_pipeline::{
    CalibrationStage, SampleDepth, ScanParameters, WhiteReference, find_significant_minima,
};

fn parameters(pixels: usize) -> ScanParameters {
    ScanParameters {
        format: FrameFormat::Rgb,
        depth: 8,
        lines: None,
        pixels_per_line: pixels,
        bytes_per_line: pixels * 3,
    }
}

fn benchmark_calibration_widths(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration_by_width");

    for pixels in [640usize, 2539, 5100] {
        let parameters = parameters(pixels);
        let lines = test_pattern(&parameters, 32);
        let white = white_pattern(&parameters, 1);

        group.bench_with_input(BenchmarkId::from_parameter(pixels), &lines, |b, lines| {
            let mut stage =
                CalibrationStage::new(parameters.samples_per_line(), SampleDepth::Eight, 0.25)
                    .unwrap();
            stage
                .set_white_reference(
                    WhiteReference::from_lines(
                        white.iter().map(Vec::as_slice),
                        SampleDepth::Eight,
                        parameters.samples_per_line(),
                    )
                    .unwrap(),
                )
                .unwrap();
            let mut out = Vec::new();

            b.iter(|| {
                for line in lines {
                    stage.process(black_box(line));
                    stage.filtered_bytes(&mut out);
                }
            });
        });
    }

    group.finish();
}

fn benchmark_minima_scan(c: &mut Criterion) {
    let parameters = parameters(2539);
    let line = &test_pattern(&parameters, 1)[0];
    let mut stage =
        CalibrationStage::new(parameters.samples_per_line(), SampleDepth::Eight, 1.0).unwrap();
    let filtered = stage.process(line).to_vec();

    c.bench_function("minima_row_2539px", |b| {
        b.iter(|| find_significant_minima(black_box(&filtered), 3, 30.0));
    });
}

criterion_group!(benches, benchmark_calibration_widths, benchmark_minima_scan);
criterion_main!(benches);
