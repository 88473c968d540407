//! Benchmark for focus scanning.
//!
//! TARGET: a full scan over 64 candidates well under 10 microseconds
//!
//! Run with: cargo bench --package vetllar_interaction --bench focus_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use vetllar_core::{EntityId, TargetRef, Vec3};
use vetllar_interaction::{
    resolve_focus, InteractionWorld, InteractiveConfig, InteractorSettings, NetRole, ScriptedSpace,
};

const CANDIDATES: u32 = 64;

fn candidate_positions() -> Vec<(TargetRef, Vec3)> {
    (0..CANDIDATES)
        .map(|i| {
            let angle = i as f32 * 0.37;
            let radius = 5.0 + (i % 7) as f32;
            (
                TargetRef::root(EntityId::new(i, 0)),
                Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius),
            )
        })
        .collect()
}

fn benchmark_resolve_focus(c: &mut Criterion) {
    let candidates = candidate_positions();

    let mut group = c.benchmark_group("resolve_focus");
    group.throughput(Throughput::Elements(u64::from(CANDIDATES)));
    group.bench_function("64_candidates", |b| {
        b.iter(|| resolve_focus(black_box(Vec3::ZERO), candidates.iter().copied()));
    });
    group.finish();
}

fn benchmark_world_scan(c: &mut Criterion) {
    let mut world = InteractionWorld::new(NetRole::Authority, CANDIDATES as usize + 1);
    let player = world.registry_mut().spawn(Vec3::ZERO).unwrap();
    world
        .add_interactor(player, InteractorSettings::default(), true)
        .unwrap();

    let config = Arc::new(InteractiveConfig::timed(1.0));
    let mut hits = Vec::new();
    for (_, position) in candidate_positions() {
        let entity = world.registry_mut().spawn(position).unwrap();
        world
            .add_interactable(entity, Some(Arc::clone(&config)), true)
            .unwrap();
        hits.push(TargetRef::root(entity));
    }
    let mut space = ScriptedSpace::new();
    space.set_sweep_hits(hits);

    c.bench_function("world_scan_64_candidates", |b| {
        b.iter(|| world.update(black_box(0.25), &space));
    });
}

criterion_group!(benches, benchmark_resolve_focus, benchmark_world_scan);
criterion_main!(benches);
