//! Performance benchmarks for episode simulation

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use flappy_neat::controller::{FeedForwardController, GapFollower};
use flappy_neat::{run_generation, Episode, SimConfig};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn benchmark_episode_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("episode_step");

    for population in [10, 100, 500].iter() {
        let mut config = SimConfig::default();
        config.episode.max_frames = u32::MAX;
        config.physics.gravity = 0.0;
        config.pipes.gap_top_min = 200;
        config.pipes.gap_top_max = 200;

        let controllers = (0..*population).map(|_| GapFollower::default());
        let mut episode = Episode::new(config, controllers, 42).unwrap();

        group.bench_with_input(
            BenchmarkId::new("population", population),
            population,
            |b, _| {
                b.iter(|| black_box(episode.step()));
            },
        );
    }

    group.finish();
}

fn benchmark_generation(c: &mut Criterion) {
    let config = SimConfig::default();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let population: Vec<FeedForwardController> = (0..50)
        .map(|_| FeedForwardController::random(6, &mut rng))
        .collect();

    c.bench_function("generation_50_feed_forward", |b| {
        b.iter(|| run_generation(&config, population.iter().cloned(), black_box(1)).unwrap());
    });
}

fn benchmark_forward(c: &mut Criterion) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let net = FeedForwardController::random(6, &mut rng);
    let inputs = [0.5f32, 0.25, -1.0];

    c.bench_function("feed_forward_forward", |b| {
        b.iter(|| net.forward(black_box(&inputs)));
    });
}

criterion_group!(
    benches,
    benchmark_episode_step,
    benchmark_generation,
    benchmark_forward
);
criterion_main!(benches);
