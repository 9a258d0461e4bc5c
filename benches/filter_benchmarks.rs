//! Benchmarks for Kalman smoothing performance

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use head_tracking::filters::{FilterState, KalmanParams, KalmanSmoother};
use nalgebra::Vector3;

fn benchmark_kalman(c: &mut Criterion) {
    let mut group = c.benchmark_group("kalman");

    // Test data - simulating noisy centroid measurements of a swaying head
    let test_data: Vec<Vector3<f64>> = (0..100)
        .map(|i| {
            let t = f64::from(i) * 0.1;
            Vector3::new(
                0.1 * t.sin() + 0.005 * rand::random::<f64>(),
                0.05 * t.cos() + 0.005 * rand::random::<f64>(),
                0.8 + 0.01 * rand::random::<f64>(),
            )
        })
        .collect();

    let tunings = vec![
        ("default", KalmanParams::default()),
        (
            "responsive",
            KalmanParams {
                measurement_noise: 1.0,
                ..KalmanParams::default()
            },
        ),
    ];

    for (name, params) in tunings {
        let smoother = KalmanSmoother::new(params);
        let mut state = FilterState::new();
        smoother.reset(&mut state);
        smoother.step(&mut state, Some(test_data[0]));

        group.bench_with_input(BenchmarkId::new("single_step", name), &test_data[1], |b, &m| {
            b.iter(|| black_box(smoother.step(&mut state, black_box(Some(m)))));
        });

        group.bench_with_input(BenchmarkId::new("sequence_100", name), &test_data, |b, data| {
            b.iter(|| {
                smoother.reset(&mut state);
                for &m in data {
                    black_box(smoother.step(&mut state, black_box(Some(m))));
                }
            });
        });

        group.bench_function(BenchmarkId::new("predict_only", name), |b| {
            b.iter(|| black_box(smoother.predict(&mut state)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_kalman);
criterion_main!(benches);
