use criterion::{criterion_group, criterion_main, Criterion};
use plume::{context::Context, parser::parse_source};
use std::hint::black_box;

static INPUT: &str = include_str!("../../demos/shapes.plume");

fn parser(input: &str) {
    let mut ctx = Context::default();
    parse_source(&mut ctx, "shapes.plume", input).unwrap();
    _ = black_box(ctx);
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("parser", |b| b.iter(|| parser(black_box(INPUT))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
