use std::collections::{HashMap, HashSet};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kernel_core::dag::levelize;

fn chain_plan(n: usize) -> (Vec<String>, HashMap<String, HashSet<String>>) {
    let plan: Vec<String> = (0..n).map(|i| format!("agent-{i}")).collect();
    let mut dependencies = HashMap::new();
    for i in 1..n {
        dependencies.insert(plan[i].clone(), HashSet::from([plan[i - 1].clone()]));
    }
    (plan, dependencies)
}

fn levelize_chain_benchmark(c: &mut Criterion) {
    let (plan, dependencies) = chain_plan(64);
    c.bench_function("levelize chain of 64", |b| {
        b.iter(|| levelize(black_box(&plan), black_box(&dependencies)).unwrap());
    });
}

fn levelize_independent_benchmark(c: &mut Criterion) {
    let plan: Vec<String> = (0..64).map(|i| format!("agent-{i}")).collect();
    let dependencies = HashMap::new();
    c.bench_function("levelize 64 independent agents", |b| {
        b.iter(|| levelize(black_box(&plan), black_box(&dependencies)).unwrap());
    });
}

criterion_group!(benches, levelize_chain_benchmark, levelize_independent_benchmark);
criterion_main!(benches);
