//! Benchmarks for payload generation and decoding

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pix_core::{crc, KeyType, Parser, PayloadBuilder};

fn create_builder() -> PayloadBuilder {
    let mut builder = PayloadBuilder::new();
    builder
        .pix_key(KeyType::Random, "7d9f0335-8dcc-4054-9bf9-0dbd61d36906")
        .unwrap()
        .merchant_name("MERCADO CENTRAL LTDA")
        .unwrap()
        .merchant_city("CURITIBA")
        .unwrap()
        .amount("1234.56")
        .unwrap()
        .transaction_id("PEDIDO123456")
        .unwrap()
        .description("Compra no balcao");
    builder
}

fn benchmark_finalize(c: &mut Criterion) {
    let builder = create_builder();

    c.bench_function("finalize", |b| b.iter(|| black_box(&builder).finalize()));
}

fn benchmark_decode(c: &mut Criterion) {
    let parser = Parser::new();
    let code = create_builder().finalize().unwrap();

    c.bench_function("decode", |b| b.iter(|| parser.decode(black_box(&code))));
}

fn benchmark_crc(c: &mut Criterion) {
    let code = create_builder().finalize().unwrap();
    let body = &code[..code.len() - 4];

    c.bench_function("crc16", |b| b.iter(|| crc::compute(black_box(body))));
}

criterion_group!(benches, benchmark_finalize, benchmark_decode, benchmark_crc);
criterion_main!(benches);
