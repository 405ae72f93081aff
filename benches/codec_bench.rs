//! Codec throughput benchmark.
//!
//! Measures encoding and decoding of profiled-traversal metrics trees,
//! strings, and full response envelopes carrying result batches.
//!
//! Run: cargo bench --bench codec_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gremlin_op::io::{BinaryReader, BinaryWriter, MessageSerializer, Metrics, Value};
use gremlin_op::server::{ResponseMessage, ResponseStatusCode};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A metrics tree `depth` levels deep with `fanout` children per node.
fn make_metrics(depth: usize, fanout: usize, prefix: &str) -> Metrics {
    let mut metrics = Metrics::new(format!("{}.0", prefix), format!("Step{}", prefix))
        .with_duration(1_250_000)
        .with_count("traverserCount", 42)
        .with_count("elementCount", 42)
        .with_annotation("percentDur", Value::Double(12.5));
    if depth > 0 {
        for i in 0..fanout {
            metrics = metrics.with_nested(make_metrics(depth - 1, fanout, &format!("{}.{}", prefix, i)));
        }
    }
    metrics
}

fn make_batch(size: usize) -> Value {
    Value::List(
        (0..size)
            .map(|i| {
                Value::Map(vec![
                    (Value::from("id"), Value::Long(i as i64)),
                    (Value::from("name"), Value::from(format!("vertex-{}", i))),
                ])
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    let writer = BinaryWriter::new();
    let reader = BinaryReader::new();

    for depth in [1usize, 3, 5] {
        let value = Value::Metrics(make_metrics(depth, 3, "m"));
        let encoded = writer.to_bytes(&value).unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", depth), &value, |b, value| {
            b.iter(|| black_box(writer.to_bytes(value).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", depth), &encoded, |b, encoded| {
            b.iter(|| {
                let mut slice = &encoded[..];
                black_box(reader.read(&mut slice).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("string");
    let writer = BinaryWriter::new();
    let reader = BinaryReader::new();

    for len in [16usize, 1024, 65536] {
        let value = Value::String("ä".repeat(len / 2));
        let encoded = writer.to_bytes(&value).unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", len), &value, |b, value| {
            b.iter(|| black_box(writer.to_bytes(value).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", len), &encoded, |b, encoded| {
            b.iter(|| {
                let mut slice = &encoded[..];
                black_box(reader.read(&mut slice).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("response");
    let serializer = MessageSerializer::new();

    for batch in [1usize, 64, 512] {
        let response = ResponseMessage::build_for(Some(Uuid::new_v4()))
            .code(ResponseStatusCode::PartialContent)
            .result(make_batch(batch))
            .create();
        let encoded = serializer.serialize_response(&response).unwrap();

        group.bench_with_input(BenchmarkId::new("serialize", batch), &response, |b, response| {
            b.iter(|| black_box(serializer.serialize_response(response).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("deserialize", batch), &encoded, |b, encoded| {
            b.iter(|| black_box(serializer.deserialize_response(&mut &encoded[..]).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_metrics, bench_strings, bench_response);
criterion_main!(benches);
