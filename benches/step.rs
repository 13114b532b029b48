use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use lw_sim::{Difficulty, SimWorld};

const DT: f32 = 1.0 / 60.0;

fn warmed_world(army_size: u32) -> SimWorld {
    let mut sim = SimWorld::new(Difficulty::Hard, army_size, 42);
    sim.set_player_target(900.0, 100.0);
    // Run the armies into contact so the bench measures real combat load
    for _ in 0..600 {
        sim.step(DT);
    }
    sim
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    for &army_size in &[100u32, 300, 600] {
        group.bench_function(format!("{army_size}_units"), |b| {
            b.iter_batched_ref(
                || warmed_world(army_size),
                |sim| sim.step(DT),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut sim = warmed_world(300);
    c.bench_function("snapshot_json", |b| {
        b.iter(|| {
            sim.step(DT);
            sim.snapshot_json()
        })
    });
}

criterion_group!(benches, bench_step, bench_snapshot);
criterion_main!(benches);
