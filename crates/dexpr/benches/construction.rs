use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use dexpr::{Interpreter, Parameter, Type, Value};

/// Regression guard: building 1000 default interpreters must stay in
/// interactive time. The seed tables are shared, so construction is a
/// handful of map inserts.
fn bench_construction(c: &mut Criterion) {
    c.bench_function("construct_1000_default_interpreters", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                black_box(Interpreter::new());
            }
        });
    });
}

fn bench_parse(c: &mut Criterion) {
    let interpreter = Interpreter::new();
    let params = [Parameter::new("x", Type::Int32)];

    c.bench_function("parse_arithmetic", |b| {
        b.iter(|| {
            black_box(
                interpreter
                    .parse("x * 2 + (x - 1) * 3", &params)
                    .expect("parse"),
            );
        });
    });
}

fn bench_invoke(c: &mut Criterion) {
    let interpreter = Interpreter::new();
    let params = [Parameter::new("x", Type::Int32)];
    let lambda = interpreter
        .parse("x * 2 + (x - 1) * 3", &params)
        .expect("parse");

    c.bench_function("invoke_precompiled", |b| {
        b.iter(|| {
            black_box(lambda.invoke(&[Value::Int32(7)]).expect("invoke"));
        });
    });
}

criterion_group!(construction, bench_construction, bench_parse, bench_invoke);
criterion_main!(construction);
