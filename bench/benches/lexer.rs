use criterion::{criterion_group, criterion_main, Criterion};
use plume::{lexer::lex, token::TokenKind};
use std::hint::black_box;

static INPUT: &str = include_str!("../../demos/shapes.plume");

fn lexer(input: &str) {
    let mut i = 0;
    for token in lex("shapes.plume".into(), input) {
        if matches!(token.kind, TokenKind::Invalid(_) | TokenKind::Newline) {
            continue;
        }
        i += 1;
    }
    black_box(i);
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("lexer", |b| b.iter(|| lexer(black_box(INPUT))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
