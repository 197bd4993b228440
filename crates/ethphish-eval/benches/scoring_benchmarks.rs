//! Benchmarks for address aggregation and scoring
//!
//! Run with: cargo bench -p ethphish-eval

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ethphish_core::Prediction;
use ethphish_eval::{aggregate_by_address, roc_curve, threshold_sweep, THRESHOLDS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic pseudo-random predictions, several per address
fn synthetic_predictions(n: usize) -> Vec<Prediction> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|i| Prediction::new((i / 3) as i32, rng.gen_range(0.0f32..1.0), 0.0))
        .collect()
}

fn benchmark_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Aggregation");

    for n in [1_000usize, 10_000, 100_000] {
        let predictions = synthetic_predictions(n);
        group.bench_with_input(BenchmarkId::new("by_address", n), &predictions, |b, preds| {
            b.iter(|| aggregate_by_address(black_box(preds)))
        });
    }

    group.finish();
}

fn benchmark_scoring(c: &mut Criterion) {
    let scores: Vec<f64> = aggregate_by_address(&synthetic_predictions(30_000))
        .into_iter()
        .map(|a| a.score)
        .collect();
    let labels: Vec<f64> = (0..scores.len()).map(|i| (i % 7 == 0) as u8 as f64).collect();

    let mut group = c.benchmark_group("Scoring");
    group.sample_size(50);

    group.bench_function("roc_curve_10k", |b| {
        b.iter(|| roc_curve(black_box(&labels), black_box(&scores)).unwrap())
    });

    group.bench_function("threshold_sweep_10k", |b| {
        b.iter(|| threshold_sweep(black_box(&labels), black_box(&scores), &THRESHOLDS).unwrap())
    });

    group.finish();
}

criterion_group!(benches, benchmark_aggregation, benchmark_scoring);
criterion_main!(benches);
