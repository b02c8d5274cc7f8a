//! Experiment analysis benchmarks for flagship-experiments

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use flagship::flagship_experiments::{
    ArmData, BayesianEngine, ExperimentConfig, ExperimentData, ExperimentRunner, Sampler,
};

fn data() -> ExperimentData {
    ExperimentData::new(ArmData::new(1000, 120), ArmData::new(1000, 156))
}

fn sampler_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler");
    let mut sampler = Sampler::seeded(1);

    group.bench_function("normal", |b| b.iter(|| black_box(sampler.normal())));
    group.bench_function("gamma_small_shape", |b| {
        b.iter(|| black_box(sampler.gamma(black_box(0.5)).unwrap()))
    });
    group.bench_function("beta", |b| {
        b.iter(|| black_box(sampler.beta(black_box(121.0), black_box(881.0)).unwrap()))
    });

    group.finish();
}

fn compute_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("bayesian_compute");
    group.sample_size(20);

    for samples in [1_000usize, 10_000, 50_000] {
        let config = ExperimentConfig::builder()
            .samples(samples)
            .seed(7)
            .build()
            .unwrap();
        let engine = BayesianEngine::new(config).unwrap();
        group.bench_with_input(BenchmarkId::new("samples", samples), &engine, |b, engine| {
            b.iter(|| engine.compute(black_box(&data())).unwrap())
        });
    }

    group.finish();
}

fn batch_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("experiment_batch");
    group.sample_size(10);

    let runner = ExperimentRunner::new(ExperimentConfig::seeded(7)).unwrap();
    for experiments in [1usize, 8] {
        group.bench_with_input(
            BenchmarkId::new("experiments", experiments),
            &experiments,
            |b, &experiments| {
                b.to_async(&rt).iter(|| async {
                    let items = (0..experiments).map(|i| (format!("exp-{}", i), data()));
                    black_box(runner.compute_batch(items).await)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, sampler_benchmark, compute_benchmark, batch_benchmark);
criterion_main!(benches);
