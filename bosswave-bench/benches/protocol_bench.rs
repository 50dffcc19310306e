//! Frame encoding/decoding benchmarks.

use bosswave_protocol::{
    po_types, read_frame, Command, Frame, PayloadObject, RandomSequence, RoutingObject,
    SequenceSource,
};
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn create_publish_frame(payload_size: usize) -> Frame {
    Frame::builder(Command::Publish, 4242)
        .kv("uri", "scratch.ns/bench/sensor/0")
        .kv("primary_access_chain", "x".repeat(44))
        .kv("elaborate_pac", "full")
        .kv("doverify", "true")
        .routing_object(RoutingObject::new(2, Bytes::from(vec![0x11u8; 160])))
        .payload_object(PayloadObject::new(
            po_types::TEXT.po_type(),
            Bytes::from("x".repeat(payload_size)),
        ))
        .build()
}

fn create_result_frame(payload_count: usize) -> Frame {
    let mut builder = Frame::builder(Command::Result, 4242)
        .kv("uri", "scratch.ns/bench/sensor/0")
        .kv("from", "y".repeat(44))
        .kv("finished", "false")
        .kv("unpack", "true");
    for i in 0..payload_count {
        builder = builder.payload_object(PayloadObject::new(
            po_types::TEXT.po_type(),
            Bytes::from(format!("reading {}", i)),
        ));
    }
    builder.build()
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for size in [100, 1000, 10000] {
        let frame = create_publish_frame(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode()));
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("frame_decode");

    for size in [100, 1000, 10000] {
        let encoded = create_publish_frame(size).encode().freeze();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.to_async(&rt).iter(|| async {
                let mut reader: &[u8] = encoded;
                black_box(read_frame(&mut reader).await.unwrap())
            });
        });
    }

    group.finish();
}

fn bench_result_decode(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("result_decode");

    for count in [1, 10, 100] {
        let encoded = create_result_frame(count).encode().freeze();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &encoded, |b, encoded| {
            b.to_async(&rt).iter(|| async {
                let mut reader: &[u8] = encoded;
                black_box(read_frame(&mut reader).await.unwrap())
            });
        });
    }

    group.finish();
}

fn bench_random_sequence(c: &mut Criterion) {
    let sequence = RandomSequence;
    c.bench_function("random_sequence", |b| {
        b.iter(|| black_box(sequence.next_seq()));
    });
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_result_decode,
    bench_random_sequence,
);

criterion_main!(benches);
