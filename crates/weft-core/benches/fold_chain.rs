//! Fold throughput benchmarks
//!
//! Measures:
//! - Deep linear chains (frame stack growth, no sharing)
//! - Wide shared DAGs (memo hit rate dominates)

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use weft_core::fold::{HandlerMap, expect_number, fold, leaf, literal_value, strict};
use weft_core::graph::{GraphBuilder, NormalizedGraph};
use weft_core::types::{Scalar, TypeTag, Value};

fn handlers() -> HandlerMap {
    let mut handlers = HandlerMap::new();
    handlers.insert("lit".into(), leaf(literal_value));
    handlers.insert(
        "add".into(),
        strict(|_, values| {
            let mut total = 0.0;
            for value in &values {
                total += expect_number(value)?;
            }
            Ok(Value::Number(total))
        }),
    );
    handlers
}

fn chain(depth: usize) -> NormalizedGraph {
    let mut builder = GraphBuilder::new();
    let one = builder.literal("lit", Scalar::Number(1.0));
    let mut current = one.clone();
    for _ in 0..depth {
        current = builder.push_node("add", vec![current, one.clone()], TypeTag::Number);
    }
    builder.finish(current)
}

/// Each layer adds the previous layer's node to itself: 2^depth leaves, depth+1 nodes.
fn doubling(depth: usize) -> NormalizedGraph {
    let mut builder = GraphBuilder::new();
    let mut current = builder.literal("lit", Scalar::Number(1.0));
    for _ in 0..depth {
        current = builder.push_node("add", vec![current.clone(), current], TypeTag::Number);
    }
    builder.finish(current)
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold_chain");
    let handlers = handlers();

    for depth in [100, 1_000, 10_000] {
        let graph = chain(depth);
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &graph, |b, graph| {
            b.iter(|| black_box(fold(graph, &handlers)))
        });
    }

    group.finish();
}

fn bench_shared(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold_shared");
    let handlers = handlers();

    for depth in [16, 32, 48] {
        let graph = doubling(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &graph, |b, graph| {
            b.iter(|| black_box(fold(graph, &handlers)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chain, bench_shared);
criterion_main!(benches);
