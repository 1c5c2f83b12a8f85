//! Criterion benchmarks for the cost evaluator and the annealing loop.
//!
//! Uses synthetic task lists with tight deadlines so most orderings carry
//! lateness.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use u_taskorder::ordering::{CostModel, SearchConfig, Task, TaskOrderingProblem};
use u_taskorder::sa::{create_rng, SaConfig, SaRunner};

fn synthetic_tasks(n: usize) -> Vec<Task> {
    let mut rng = create_rng(42);
    (0..n)
        .map(|i| {
            let duration = rng.random_range(0.25..4.0);
            let deadline = rng.random_range(1.0..(n as f64));
            let difficulty = rng.random_range(1..=5u8);
            Task::new(format!("task-{i}"), duration, deadline, difficulty)
        })
        .collect()
}

fn bench_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("cost");
    let model = CostModel::default();

    for &n in &[10usize, 50, 200] {
        let tasks = synthetic_tasks(n);
        let order: Vec<usize> = (0..n).rev().collect();
        let input = (tasks, order);
        group.bench_with_input(BenchmarkId::new("cost", n), &input, |b, (t, o)| {
            b.iter(|| black_box(model.cost(black_box(t), black_box(o))))
        });
        group.bench_with_input(BenchmarkId::new("evaluate", n), &input, |b, (t, o)| {
            b.iter(|| black_box(model.evaluate(black_box(t), black_box(o))))
        });
    }
    group.finish();
}

fn bench_sa_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("sa_ordering");
    group.sample_size(10);

    for &n in &[10usize, 30, 100] {
        let problem = TaskOrderingProblem::new(
            synthetic_tasks(n),
            CostModel::default(),
            SearchConfig::default(),
        );
        let config = SaConfig::default()
            .with_initial_temperature(100.0)
            .with_min_temperature(0.01)
            .with_max_iterations(5000)
            .with_seed(42);
        group.bench_with_input(BenchmarkId::from_parameter(n), &(problem, config), |b, (p, c)| {
            b.iter(|| {
                let result = SaRunner::run(black_box(p), black_box(c));
                black_box(result)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cost, bench_sa_ordering);
criterion_main!(benches);
