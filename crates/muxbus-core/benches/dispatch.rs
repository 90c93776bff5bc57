//! Dispatch path benchmarks for muxbus-core.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use muxbus_core::{dispatch, DispatchCounters};
use muxbus_protocol::codec;
use serde_json::json;
use std::sync::Arc;

fn bench_adapter(c: &mut Criterion) {
    let counters = Arc::new(DispatchCounters::default());
    let adapter = dispatch::raw("bench", "userLogin", counters, |payload| {
        black_box(payload);
    });

    let matching = codec::encode("userLogin", &json!({"userId": "u1"})).unwrap();
    let other = codec::encode("userLogout", &json!({"userId": "u1"})).unwrap();

    let mut group = c.benchmark_group("adapter");
    group.bench_function("matching", |b| b.iter(|| adapter(black_box(&matching))));
    group.bench_function("other_event", |b| b.iter(|| adapter(black_box(&other))));
    group.bench_function("malformed", |b| b.iter(|| adapter(black_box("not json"))));
    group.finish();
}

fn bench_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_in");

    for kinds in [1usize, 8, 64] {
        let counters = Arc::new(DispatchCounters::default());
        let adapters: Vec<_> = (0..kinds)
            .map(|i| {
                dispatch::raw("bench", &format!("event-{i}"), Arc::clone(&counters), |p| {
                    black_box(p);
                })
            })
            .collect();
        let message = codec::encode("event-0", &json!({"n": 1})).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(kinds), &message, |b, msg| {
            b.iter(|| {
                for adapter in &adapters {
                    adapter(black_box(msg));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_adapter, bench_fan_in);
criterion_main!(benches);
