//! Benchmarks for parameter escaping and encoding.

#![allow(clippy::unwrap_used, missing_docs)]

use ch_types::{Params, Value, escape};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Benchmark escaping of string literals.
fn bench_escape(c: &mut Criterion) {
    let mut group = c.benchmark_group("escape");

    // Clean input borrows the original buffer
    let clean = "This is a typical column value without any quotes in it at all".repeat(16);
    group.throughput(Throughput::Bytes(clean.len() as u64));
    group.bench_function("clean", |b| b.iter(|| black_box(escape(black_box(clean.as_bytes())))));

    // Sparse quotes (typical prose)
    let sparse = "It's a value that's got a few apostrophes, isn't it? ".repeat(16);
    group.throughput(Throughput::Bytes(sparse.len() as u64));
    group.bench_function("sparse", |b| b.iter(|| black_box(escape(black_box(sparse.as_bytes())))));

    // Dense escapes (worst case)
    let dense = "'\\".repeat(512);
    group.throughput(Throughput::Bytes(dense.len() as u64));
    group.bench_function("dense", |b| b.iter(|| black_box(escape(black_box(dense.as_bytes())))));

    group.finish();
}

/// Benchmark encoding of array parameters.
fn bench_array_params(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_params");

    let strings: Vec<Value> = (0..1000).map(|i| Value::from(format!("tag'{i}"))).collect();
    let params = Params::named([("tags", Value::Array(strings))]);
    group.bench_function("strings_1000", |b| b.iter(|| black_box(params.encode())));

    let ints: Vec<Value> = (0..1000i64).map(Value::from).collect();
    let params = Params::named([("ids", Value::Array(ints))]);
    group.bench_function("ints_1000", |b| b.iter(|| black_box(params.encode())));

    group.finish();
}

criterion_group!(benches, bench_escape, bench_array_params);
criterion_main!(benches);
