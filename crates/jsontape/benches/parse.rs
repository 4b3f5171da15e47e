//! Benchmark – DOM parse, on-demand scan, and a `serde_json` baseline.
#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jsontape::{PaddedBytes, Parser};
use std::hint::black_box;

/// Produce a deterministic JSON document of roughly `target_len` bytes: an
/// array of small objects mixing strings, integers, and doubles, which
/// exercises every scalar path without favoring one.
fn make_json_payload(target_len: usize) -> String {
    let mut out = String::with_capacity(target_len + 64);
    out.push('[');
    let mut i = 0u64;
    while out.len() < target_len {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!(
            "{{\"id\":{i},\"name\":\"user-{i}\",\"score\":{}.5,\"active\":{}}}",
            i % 1000,
            i % 2 == 0
        ));
        i += 1;
    }
    out.push(']');
    out
}

fn bench_dom_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("dom_parse");
    for &size in &[1 << 12, 1 << 16, 1 << 20] {
        let payload = make_json_payload(size);
        let input = PaddedBytes::from(payload.as_str());
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            let mut parser = Parser::new();
            b.iter(|| {
                let doc = parser.parse(black_box(input)).expect("payload is valid");
                black_box(doc.tape_len())
            });
        });
    }
    group.finish();
}

fn bench_ondemand_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("ondemand_scan");
    for &size in &[1 << 12, 1 << 16, 1 << 20] {
        let payload = make_json_payload(size);
        let input = PaddedBytes::from(payload.as_str());
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            let mut parser = Parser::new();
            b.iter(|| {
                // Sum the ids without materializing anything else.
                let mut doc = parser.iterate(black_box(input)).expect("payload is valid");
                let mut total = 0i64;
                let mut arr = doc.get_array().expect("root is an array");
                while let Some(mut row) = arr.next_element().expect("well-formed") {
                    let mut obj = row.get_object().expect("rows are objects");
                    if let Some((_, mut v)) = obj.next_field().expect("well-formed") {
                        total += v.get_i64().expect("id is an integer");
                    }
                }
                black_box(total)
            });
        });
    }
    group.finish();
}

fn bench_serde_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("serde_json_baseline");
    for &size in &[1 << 12, 1 << 16, 1 << 20] {
        let payload = make_json_payload(size);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            payload.as_str(),
            |b, payload| {
                b.iter(|| {
                    let v: serde_json::Value =
                        serde_json::from_str(black_box(payload)).expect("payload is valid");
                    black_box(v)
                });
            },
        );
    }
    group.finish();
}

fn bench_document_stream(c: &mut Criterion) {
    let docs: Vec<String> = (0..4096)
        .map(|i| format!("{{\"seq\":{i},\"ok\":true}}"))
        .collect();
    let payload = docs.join("\n");
    let input = PaddedBytes::from(payload.as_str());
    let mut group = c.benchmark_group("document_stream");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("ndjson_4096", |b| {
        let mut parser = Parser::new();
        b.iter(|| {
            let mut stream = parser
                .iterate_many(black_box(&input), 1 << 16)
                .expect("stream starts");
            let mut count = 0usize;
            while stream.next_document().expect("stream is clean").is_some() {
                count += 1;
            }
            black_box(count)
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_dom_parse,
    bench_ondemand_scan,
    bench_serde_baseline,
    bench_document_stream
);
criterion_main!(benches);
