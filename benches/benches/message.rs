//! Benchmarks for message formatting, recording and sequence assertions.
//!
//! Run with: `cargo bench --package katkit-benches --bench message`

// Allow missing docs for criterion_group! macro generated functions
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use katkit_client::ClientHandler;
use katkit_core::{Message, Sensor, SensorStatus};
use katkit_testing::Recorder;
use katkit_testing::assertions::{check_msgs_equal, check_msgs_match};

/// A client that ignores everything.
struct Sink;

impl ClientHandler for Sink {}

fn sample_sensor() -> Sensor {
    Sensor::integer("an.int", "An Integer.", "count", -5, 5).with_reading(
        12345.0,
        SensorStatus::Nominal,
        "3",
    )
}

fn sensor_value_inform(mid: u64) -> Message {
    Message::inform("sensor-value")
        .args(sample_sensor().value_arguments())
        .with_mid(mid)
}

fn traffic(count: u64) -> Vec<Message> {
    (1..=count)
        .flat_map(|mid| {
            [
                sensor_value_inform(mid),
                Message::reply("sensor-value").args(["ok", "1"]).with_mid(mid),
            ]
        })
        .collect()
}

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");

    let plain = Message::reply("new-command")
        .args(["ok", "param1", "param2"])
        .with_mid(3u64);
    group.bench_function("plain_reply", |b| b.iter(|| black_box(&plain).to_string()));

    let escaped = Message::inform("sensor-list").args(sample_sensor().list_arguments());
    group.bench_function("escaped_inform", |b| {
        b.iter(|| black_box(&escaped).to_string());
    });

    let long = Message::inform("log").arg("x y ".repeat(256));
    group.throughput(Throughput::Bytes(1024));
    group.bench_function("long_argument", |b| b.iter(|| black_box(&long).to_string()));

    group.finish();
}

fn bench_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("recording");

    for count in [10u64, 100, 1000] {
        let messages = traffic(count);
        group.throughput(Throughput::Elements(messages.len() as u64));
        group.bench_with_input(BenchmarkId::new("record", count), &messages, |b, msgs| {
            b.iter(|| {
                let recorder = Recorder::new(Sink);
                for msg in msgs {
                    recorder.handle_message(black_box(msg));
                }
                recorder.messages().len()
            });
        });
    }

    group.finish();
}

fn bench_assertions(c: &mut Criterion) {
    let mut group = c.benchmark_group("assertions");

    let messages = traffic(50);
    let canonical: Vec<String> = messages.iter().map(ToString::to_string).collect();
    let expected: Vec<&str> = canonical.iter().map(String::as_str).collect();
    group.bench_function("exact", |b| {
        b.iter(|| check_msgs_equal(black_box(&messages), &expected));
    });

    let patterns: Vec<&str> = messages
        .iter()
        .map(|m| if m.is_reply() { r"!sensor-value\[\d+\] ok" } else { r"#sensor-value" })
        .collect();
    group.bench_function("pattern", |b| {
        b.iter(|| check_msgs_match(black_box(&messages), &patterns));
    });

    group.finish();
}

criterion_group!(benches, bench_formatting, bench_recording, bench_assertions);
criterion_main!(benches);
