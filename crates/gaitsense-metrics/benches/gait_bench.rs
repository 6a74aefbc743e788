//! Benchmarks for the gait analysis pipeline
//!
//! Run with: cargo bench --package gaitsense-metrics

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use gaitsense_core::{Confidence, Keypoint, KeypointType, Pose, Timestamp};
use gaitsense_metrics::{
    CadenceConfig, GaitAnalyzer, GaitAnalyzerConfig, PoseSmoother, SignalCadenceEstimator,
    SmootherConfig,
};

const FRAME_INTERVAL_MS: i64 = 33;
const FRAME_INTERVAL_S: f64 = 1.0 / 30.0;

/// Create a walking pose with sinusoidal ankle motion, roughly
/// 120 steps per minute when sampled at 30 fps.
fn walking_pose(frame: usize) -> Pose {
    use std::f64::consts::PI;

    // One full gait cycle every 30 frames, ankles in antiphase.
    let phase = 2.0 * PI * (frame as f64) / 30.0;
    let forward = 4.0 * frame as f64;
    let swing = 20.0 * phase.sin();
    let sway = 3.0 * (phase / 2.0).sin();
    let confidence = Confidence::clamped(0.9);

    let mut pose = Pose::new(Timestamp::from_millis(frame as i64 * FRAME_INTERVAL_MS));
    let points = [
        (KeypointType::Nose, 300.0 + sway, 50.0),
        (KeypointType::LeftShoulder, 280.0 + sway, 100.0),
        (KeypointType::RightShoulder, 320.0 + sway, 100.0),
        (KeypointType::LeftHip, 285.0 + sway, 200.0),
        (KeypointType::RightHip, 315.0 + sway, 200.0),
        (KeypointType::LeftKnee, 285.0 + swing / 2.0, 300.0),
        (KeypointType::RightKnee, 315.0 - swing / 2.0, 300.0),
        (KeypointType::LeftAnkle, 285.0 + swing, 400.0 - swing.max(0.0)),
        (KeypointType::RightAnkle, 315.0 - swing, 400.0 + swing.min(0.0)),
    ];
    for (kind, x, y) in points {
        pose.set_keypoint(Keypoint::new(kind, x + forward, y, confidence));
    }
    pose
}

/// Benchmark steady-state pose smoothing
fn bench_pose_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pose Smoothing");
    group.measurement_time(Duration::from_secs(5));

    let mut smoother = PoseSmoother::new(SmootherConfig::default());
    // Warm the history so the benchmark measures steady-state blending
    // rather than the pass-through of the first frames.
    for frame in 0..10 {
        smoother.smooth(&walking_pose(frame));
    }
    let pose = walking_pose(10);

    group.throughput(Throughput::Elements(1));
    group.bench_function("smooth_frame", |b| {
        b.iter(|| smoother.smooth(black_box(&pose)));
    });

    group.finish();
}

/// Benchmark frequency-domain cadence estimation over growing windows
fn bench_signal_cadence(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cadence Estimation");
    group.measurement_time(Duration::from_secs(5));

    for &window in &[45usize, 90, 135] {
        let poses: Vec<Pose> = (0..window).map(walking_pose).collect();
        let refs: Vec<&Pose> = poses.iter().collect();
        let mut estimator = SignalCadenceEstimator::new(CadenceConfig::default());

        group.throughput(Throughput::Elements(window as u64));
        group.bench_with_input(
            BenchmarkId::new("autocorrelate", window),
            &refs,
            |b, recent| {
                b.iter(|| estimator.update(black_box(recent)));
            },
        );
    }

    group.finish();
}

/// Benchmark summary generation over snapshot logs of varying length
fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session Summary");
    group.measurement_time(Duration::from_secs(5));

    for &frames in &[100usize, 1000] {
        let mut analyzer = GaitAnalyzer::new(GaitAnalyzerConfig::default()).unwrap();
        for frame in 0..frames {
            analyzer.process_frame(&walking_pose(frame), FRAME_INTERVAL_S);
        }

        group.throughput(Throughput::Elements(frames as u64));
        group.bench_with_input(
            BenchmarkId::new("summarize", frames),
            &analyzer,
            |b, analyzer| {
                b.iter(|| analyzer.summarize());
            },
        );
    }

    group.finish();
}

/// Benchmark the full per-session pipeline: smoothing, kinematics,
/// step detection, cadence fusion, and the final summary
fn bench_session_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session Pipeline");
    group.measurement_time(Duration::from_secs(10));

    let config = GaitAnalyzerConfig::default();
    for &frames in &[90usize, 300] {
        let poses: Vec<Pose> = (0..frames).map(walking_pose).collect();

        group.throughput(Throughput::Elements(frames as u64));
        group.bench_with_input(
            BenchmarkId::new("analyze_session", frames),
            &poses,
            |b, poses| {
                b.iter(|| {
                    let mut analyzer = GaitAnalyzer::new(config.clone()).unwrap();
                    for pose in poses {
                        analyzer.process_frame(black_box(pose), FRAME_INTERVAL_S);
                    }
                    analyzer.summarize()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_pose_smoothing,
    bench_signal_cadence,
    bench_summary,
    bench_session_pipeline,
);
criterion_main!(benches);
