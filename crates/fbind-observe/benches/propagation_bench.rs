//! Benchmarks for change propagation through compiled observers.
//!
//! Run with: `cargo bench --package fbind-observe --bench propagation_bench`
//!
//! # Performance Baselines
//!
//! These benchmarks establish baselines for:
//! - One-way binding propagation through a property path
//! - Incremental `mapBlock` updates on large lists
//! - `sortedBlock` reconciliation after a single insertion

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fbind_core::{List, Object, Value};
use fbind_observe::{Bindings, Cancel, Compiler, Descriptor, Emit, Scope, Syntax};

// ============================================================================
// Fixtures
// ============================================================================

fn numbers(len: usize) -> List {
    (0..len).map(|n| Value::from((n * 7919) % len)).collect()
}

fn start_collection(kind: &str, list: &List) -> (Object, Cancel) {
    let root = Object::new();
    root.set("items", list.clone());
    let syntax = Syntax::call(
        kind,
        [
            Syntax::path("items"),
            Syntax::call("mul", [Syntax::value(), Syntax::literal(2)]),
        ],
    );
    let observer = Compiler::new().compile(&syntax).expect("valid syntax");
    let sink: Emit = Rc::new(|v: Value| drop(black_box(v)));
    let cancel = observer(sink, &Scope::new(root.clone()));
    (root, cancel)
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_one_way(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_way");
    let object = Object::new();
    object.set("a", Object::new());
    let _bindings = Bindings::create(
        object.clone(),
        [("copy", Descriptor::OneWay(Syntax::path("a.b")))],
    )
    .expect("valid bindings");
    let inner = object.get("a");
    let inner = inner.as_object().expect("object").clone();
    let mut n = 0;
    group.bench_function("nested_path_set", |b| {
        b.iter(|| {
            n += 1;
            inner.set("b", n);
            black_box(object.get("copy"))
        });
    });
    group.finish();
}

fn bench_map_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_block");
    for size in [100usize, 1_000, 10_000] {
        let list = numbers(size);
        let (_root, _cancel) = start_collection("mapBlock", &list);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("set_middle", size), &list, |b, list| {
            let mut n = 0;
            b.iter(|| {
                n += 1;
                list.set(list.len() / 2, Value::from(n));
            });
        });
    }
    group.finish();
}

fn bench_sorted_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorted_block");
    for size in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::new("push_pop", size), &size, |b, &size| {
            let list = numbers(size);
            let (_root, _cancel) = start_collection("sortedBlock", &list);
            b.iter(|| {
                list.push([Value::from(size / 2)]);
                black_box(list.pop())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_one_way, bench_map_block, bench_sorted_block);
criterion_main!(benches);
