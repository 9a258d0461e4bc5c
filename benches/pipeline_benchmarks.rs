//! Benchmarks for the per-frame tracking pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use head_tracking::config::Config;
use head_tracking::estimator::PositionEstimator;
use head_tracking::face_locator::NormedCorrelationMatcher;
use head_tracking::frame::{OriginCorner, Orientation, ScanDirection};
use head_tracking::normalizer::CoordinateNormalizer;
use head_tracking::pipeline::HeadTracker;
use head_tracking::synthetic::{BrightBlobClassifier, SceneConfig, SyntheticFrameSource};
use opencv::core::Point;

fn benchmark_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalization");

    let orientations = [
        ("row_major_top_left", Orientation::CANONICAL),
        (
            "column_major_bottom_right",
            Orientation::new(ScanDirection::ColumnMajor, OriginCorner::BottomRight),
        ),
    ];

    for (name, orientation) in orientations {
        let frame = SyntheticFrameSource::new(SceneConfig::default(), orientation).render(0);
        let mut normalizer = CoordinateNormalizer::new();

        group.bench_with_input(BenchmarkId::new("160x120", name), &frame, |b, frame| {
            b.iter(|| {
                let grid = normalizer.normalize(black_box(frame)).unwrap();
                black_box(grid.width);
            });
        });
    }

    group.finish();
}

fn benchmark_centroid(c: &mut Criterion) {
    let mut group = c.benchmark_group("centroid");

    let frame = SyntheticFrameSource::new(SceneConfig::default(), Orientation::CANONICAL).render(0);
    let mut normalizer = CoordinateNormalizer::new();
    let grid = normalizer.normalize(&frame).unwrap();

    for radius in [2usize, 5, 10] {
        let estimator = PositionEstimator::new(radius);
        group.bench_with_input(BenchmarkId::new("window_radius", radius), &radius, |b, _| {
            b.iter(|| black_box(estimator.estimate(grid, black_box(Point::new(80, 55)))));
        });
    }

    group.finish();
}

fn benchmark_tracking(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracking");
    group.sample_size(30);

    let scene = SceneConfig {
        sway: 6.0,
        sway_period: 40,
        ..SceneConfig::default()
    };
    let source = SyntheticFrameSource::new(scene, Orientation::CANONICAL);
    let frames: Vec<_> = (0..40).map(|i| source.render(i)).collect();

    let mut tracker = HeadTracker::new(
        &Config::default(),
        Box::new(BrightBlobClassifier),
        Box::new(NormedCorrelationMatcher),
    )
    .unwrap();

    group.bench_function("warm_sequence_40", |b| {
        b.iter(|| {
            for frame in &frames {
                black_box(tracker.process(black_box(frame)).unwrap());
            }
        });
    });

    group.bench_function("cold_frame", |b| {
        b.iter(|| {
            tracker.reset_tracking();
            black_box(tracker.process(black_box(&frames[0])).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_normalization, benchmark_centroid, benchmark_tracking);
criterion_main!(benches);
