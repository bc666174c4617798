//! Container write and random access benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use segstream_bench::{random_data, text_input, xml_input};
use segstream_core::{
    create_writer, open_reader, Config, DirectoryStore, InputStreamProvider, MemoryStore,
    SegmentSink, SegmentWriter, StreamId,
};
use tempfile::TempDir;

/// Benchmark writing one entry through the segment writer.
fn bench_segment_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_write");

    let inputs = [
        ("text", text_input(4096, 60)),
        ("xml", xml_input(2048, 100)),
        ("binary", random_data(256 * 1024)),
    ];

    for (name, input) in &inputs {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            let segment_writer = SegmentWriter::default();
            b.iter(|| {
                let store = MemoryStore::new();
                let id = StreamId::new("bench");
                let mut writer = create_writer(&store, &id, &Config::default()).unwrap();
                let copied = segment_writer
                    .write(black_box(&input[..]), &mut writer, true)
                    .unwrap();
                black_box(copied);
            });
        });
    }

    group.finish();
}

/// Benchmark writing many small entries to files.
fn bench_file_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_write");
    group.sample_size(20);

    for entry_count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*entry_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(entry_count),
            entry_count,
            |b, &entry_count| {
                let input = text_input(8, 40);
                let config = Config::default().sync_on_close(false);
                let segment_writer = SegmentWriter::new(config.clone());
                b.iter(|| {
                    let dir = TempDir::new().unwrap();
                    let store = DirectoryStore::with_config(dir.path(), &config);
                    let mut writer = create_writer(&store, &StreamId::new("bench"), &config).unwrap();
                    for _ in 0..entry_count {
                        segment_writer.write(&input[..], &mut writer, false).unwrap();
                    }
                    writer.close().unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark opening a random entry and reading a random segment.
fn bench_random_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_segment");

    for entry_count in [100, 10_000].iter() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::new(dir.path());
        let id = StreamId::new("bench");

        let mut writer = create_writer(&store, &id, &Config::default()).unwrap();
        let segment_writer = SegmentWriter::default();
        let input = text_input(16, 32);
        for _ in 0..*entry_count {
            segment_writer.write(&input[..], &mut writer, false).unwrap();
        }
        writer.close().unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(entry_count),
            entry_count,
            |b, &entry_count| {
                let mut reader = open_reader(&store, &id).unwrap();
                let mut rng = rand::thread_rng();
                b.iter(|| {
                    let entry = rng.gen_range(0..entry_count as u64);
                    let stream = reader.input_stream(black_box(entry)).unwrap();
                    let segment = rng.gen_range(0..stream.segment_count());
                    black_box(stream.read_segment(segment).unwrap());
                });
                reader.close().unwrap();
            },
        );
    }

    group.finish();
}

/// Benchmark streaming every entry through the provider.
fn bench_provider_scan(c: &mut Criterion) {
    let store = MemoryStore::new();
    let id = StreamId::new("bench");
    let mut writer = create_writer(&store, &id, &Config::default()).unwrap();
    let segment_writer = SegmentWriter::default();
    for _ in 0..1000 {
        segment_writer
            .write(&text_input(4, 64)[..], &mut writer, false)
            .unwrap();
    }
    writer.close().unwrap();

    c.bench_function("provider_scan_1000", |b| {
        let mut provider = segstream_core::open_provider(&store, &id).unwrap();
        b.iter(|| {
            let mut total = 0u64;
            for n in 0..provider.stream_count() {
                let mut stream = provider.stream(n).unwrap();
                total += std::io::copy(&mut stream, &mut std::io::sink()).unwrap();
            }
            black_box(total);
        });
        provider.close().unwrap();
    });
}

criterion_group!(
    benches,
    bench_segment_write,
    bench_file_write,
    bench_random_segment,
    bench_provider_scan,
);

criterion_main!(benches);
