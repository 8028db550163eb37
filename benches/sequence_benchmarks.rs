//! Benchmarks for the pure frame-sequence and geometry planners.
//!
//! Run with: cargo bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gifmaker::sequence::{decimation_victims, mirror_plan};
use gifmaker::{DecimationFactor, Dimensions, Gravity, ResizePlan};

fn benchmark_mirror_plan(criterion: &mut Criterion) {
    let sequence: Vec<u64> = (1..=10_000).collect();
    criterion.bench_function("mirror_plan_10k", |bencher| {
        bencher.iter(|| mirror_plan(black_box(&sequence)));
    });
}

fn benchmark_decimation(criterion: &mut Criterion) {
    let sequence: Vec<u64> = (1..=10_000).collect();
    let factor = match DecimationFactor::new(3) {
        Ok(factor) => factor,
        Err(error) => panic!("{error}"),
    };
    criterion.bench_function("decimation_victims_10k", |bencher| {
        bencher.iter(|| decimation_victims(black_box(&sequence), factor));
    });
}

fn benchmark_resize_plan(criterion: &mut Criterion) {
    let target = match Dimensions::new(480, 270) {
        Ok(target) => target,
        Err(error) => panic!("{error}"),
    };
    criterion.bench_function("resize_plan_all_gravities", |bencher| {
        bencher.iter(|| {
            for gravity in Gravity::ALL {
                black_box(ResizePlan::compute(
                    black_box(1920),
                    black_box(1080),
                    target,
                    gravity,
                ));
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_mirror_plan,
    benchmark_decimation,
    benchmark_resize_plan
);
criterion_main!(benches);
