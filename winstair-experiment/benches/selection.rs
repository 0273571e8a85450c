use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use pprof::criterion::{Output, PProfProfiler};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

use winstair_core::{Condition, Difficulty, StaircaseKey, StaircasePhase, StimulusItem};
use winstair_experiment::{DuplicateAvoidanceSelector, IntensityTracker, RecencyWindow, StimulusPool};
use winstair_experiment::{AdaptiveController, ExperimentConfig};

fn key() -> StaircaseKey {
    StaircaseKey::new(StaircasePhase::Main, Condition::Auditory, Difficulty::Easy)
}

/// Pool of `n` items over a vocabulary of `vocab` targets.
fn pool(n: usize, vocab: usize) -> StimulusPool {
    let mut pool = StimulusPool::new();
    for i in 0..n {
        let target = format!("word_{}", i % vocab);
        let distractors = [format!("foil_{i}_a"), format!("foil_{i}_b"), format!("foil_{i}_c")];
        pool.insert(key(), StimulusItem::new(target.as_str(), distractors.iter().map(String::as_str)));
    }
    pool
}

/// A full recency window, the steady state of a main phase.
fn warm_window(vocab: usize) -> RecencyWindow {
    let mut window = RecencyWindow::new(20);
    for i in 0..20 {
        window.push(&StimulusItem::new(format!("word_{}", i % vocab).as_str(), ["warm"]));
    }
    window
}

pub fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_main");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    let selector = DuplicateAvoidanceSelector::new(25);
    // small vocabularies force retries, 21 leaves exactly one fresh target
    for vocab in [200usize, 40, 21] {
        group.bench_with_input(BenchmarkId::from_parameter(vocab), &vocab, |b, &vocab| {
            b.iter_batched(
                || (pool(200, vocab), warm_window(vocab), ChaCha8Rng::seed_from_u64(7)),
                |(mut pool, mut window, mut rng)| {
                    let s = selector.select(&mut pool, &key(), &mut window, &mut rng);
                    black_box(s.map(|s| s.rejections).unwrap_or_default())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

pub fn bench_next_intensity(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_intensity");
    group.sample_size(60);

    let config = ExperimentConfig::default();
    let mut controller = AdaptiveController::new(&config).unwrap();
    let mut tracker = IntensityTracker::new();
    tracker.record(key().baseline_counterpart(), 0.5, true);
    controller.snapshot_baseline(&tracker);
    for n in 0..300 {
        tracker.record(key(), 0.5, n % 4 != 0);
    }

    group.bench_function("evaluation_trial", |b| {
        b.iter(|| black_box(controller.next_intensity(black_box(&key()), &tracker).map(|(i, _)| i)))
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
        .confidence_level(0.95)
        .noise_threshold(0.02);
    targets = bench_select, bench_next_intensity
}

criterion_main!(benches);
