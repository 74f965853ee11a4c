//! Flush throughput
//!
//! Measures how long one flush takes as the number of scheduled components
//! grows, with and without after-update callbacks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use folio_core::component::{Callback, Component, DirtyBits};
use folio_core::scheduler::Scheduler;

fn build_components(scheduler: &Scheduler, count: usize, with_callbacks: bool) -> Vec<Component> {
    (0..count)
        .map(|i| {
            let component = Component::new(format!("c{i}"))
                .with_update(|| Ok(()))
                .with_fragment(|dirty: &DirtyBits| {
                    black_box(dirty.words());
                });
            if with_callbacks {
                scheduler.init(&component, || {
                    scheduler
                        .add_after_update(Callback::new(|| {
                            black_box(());
                        }))
                        .expect("registered inside init");
                });
            }
            component
        })
        .collect()
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");

    for &count in &[10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(count as u64));

        for with_callbacks in [false, true] {
            let label = if with_callbacks { "with_callbacks" } else { "updates_only" };
            let scheduler = Scheduler::new();
            let components = build_components(&scheduler, count, with_callbacks);

            group.bench_with_input(BenchmarkId::new(label, count), &components, |b, components| {
                b.iter(|| {
                    for (slot, component) in components.iter().enumerate() {
                        scheduler.make_dirty(component, slot % 64);
                    }
                    scheduler.run_microtasks().expect("flush succeeds");
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_flush);
criterion_main!(benches);
