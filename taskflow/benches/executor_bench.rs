//! Benchmarks for graph execution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use taskflow::prelude::*;

type BenchGraph = Graph<usize, usize>;

/// One source, `width` parallel tasks, one sink.
fn fan_out_fan_in(width: usize) -> BenchGraph {
    let mut builder: GraphBuilder<usize, usize> = GraphBuilder::new();
    let task = |value: usize| -> Arc<dyn Task<usize, usize>> {
        Arc::new(FnTask::new(move || Ok(value)))
    };

    builder.add_node(0, task(0)).unwrap();
    for id in 1..=width {
        builder.add_node(id, task(id)).unwrap();
        builder.add_dependency(0, id).unwrap();
    }
    builder
        .add_as_dependent_on_all_leaf_nodes(width + 1, task(width + 1))
        .unwrap();
    builder.build().unwrap()
}

/// A single chain of `length` tasks.
fn chain(length: usize) -> BenchGraph {
    let mut builder: GraphBuilder<usize, usize> = GraphBuilder::new();
    for id in 0..length {
        builder
            .add_node(id, Arc::new(FnTask::new(move || Ok(id))))
            .unwrap();
        if id > 0 {
            builder.add_dependency(id - 1, id).unwrap();
        }
    }
    builder.build().unwrap()
}

fn executor_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();
    let pool = WorkerPool::with_handle(4, runtime.handle().clone());
    let mut executor = DependentTasksExecutor::with_pool(pool);

    let mut group = c.benchmark_group("fan_out_fan_in");
    for width in [8, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let graph = fan_out_fan_in(width);
                let results = runtime.block_on(executor.execute(&graph)).unwrap();
                black_box(results.len())
            });
        });
    }
    group.finish();

    c.bench_function("chain_128", |b| {
        b.iter(|| {
            let graph = chain(128);
            let results = runtime.block_on(executor.execute(&graph)).unwrap();
            black_box(results.len())
        });
    });
}

criterion_group!(benches, executor_benchmark);
criterion_main!(benches);
