//! Benchmarks for session bookkeeping.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use studentguard::core::ActionKind;
use studentguard::pipeline::{ResultCache, StageMachine, StagePayload};
use studentguard::testing::fixtures;

fn machine_benchmark(c: &mut Criterion) {
    c.bench_function("machine_full_cycle", |b| {
        b.iter(|| {
            let mut machine = StageMachine::new();
            for action in [ActionKind::Upload, ActionKind::Clean, ActionKind::Train] {
                if let Ok(ticket) = machine.begin(action) {
                    let _ = machine.transition(&ticket, Ok(()));
                }
            }
            black_box(machine.stage())
        });
    });

    c.bench_function("machine_reject_prerequisite", |b| {
        let mut machine = StageMachine::new();
        b.iter(|| black_box(machine.check(black_box(ActionKind::Predict)).is_err()));
    });
}

fn cache_benchmark(c: &mut Criterion) {
    let mut cache = ResultCache::new();
    cache.store(StagePayload::Upload(fixtures::upload_summary(&[("age", 3), ("score", 2)])));
    cache.store(StagePayload::Clean(fixtures::clean_summary(2)));

    c.bench_function("displayed_missing_total", |b| {
        b.iter(|| black_box(cache.displayed_missing_total()));
    });

    c.bench_function("store_upload_invalidates", |b| {
        let summary = fixtures::upload_summary(&[("age", 1)]);
        b.iter(|| {
            let mut cache = cache.clone();
            cache.store(StagePayload::Upload(summary.clone()));
            black_box(cache.highest_tier())
        });
    });
}

criterion_group!(benches, machine_benchmark, cache_benchmark);
criterion_main!(benches);
