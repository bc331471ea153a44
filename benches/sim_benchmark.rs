//! Benchmarks for running complete race simulations.
//!
//! This benchmarks the full trial loop - the hot path of the Monte Carlo
//! runner.

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use derby::{Condition, Effect, Engine, MoveGen, Phase, Skill};

/// A four-racer roster with a mix of chance and order-dependent skills.
fn bench_roster() -> Engine {
    let mut engine = Engine::new(23).expect("positive length");

    let a = engine.add_racer("a");
    engine
        .attach_skill(
            a,
            Skill::new(
                Phase::MoveBefore,
                Condition::Chance(0.5),
                Effect::ExtraSteps(1),
            ),
        )
        .expect("valid roster");

    let b = engine.add_racer("b");
    engine
        .set_move_gen(b, MoveGen::Choice(vec![1, 3]))
        .expect("valid roster");

    engine.add_racer("c");
    engine.add_racer("d");
    engine
}

fn bench_single_trial(c: &mut Criterion) {
    let engine = bench_roster();

    c.bench_function("single_trial_4r", |bencher| {
        bencher.iter(|| {
            let mut engine = engine.clone();
            let mut rng = ChaCha8Rng::seed_from_u64(black_box(42));
            let result = engine.run_trial(&mut rng);
            black_box(result)
        });
    });
}

fn bench_trial_batch(c: &mut Criterion) {
    let engine = bench_roster();

    c.bench_function("run_trials_1000", |bencher| {
        bencher.iter(|| {
            let hist = engine.run_trials(black_box(1000), black_box(7));
            black_box(hist)
        });
    });
}

criterion_group!(benches, bench_single_trial, bench_trial_batch);
criterion_main!(benches);
