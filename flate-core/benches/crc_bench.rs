//! Throughput benchmarks for the checksum primitives.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flate_core::checksum::{Adler32, Crc32};
use std::hint::black_box;

mod test_data {
    pub fn text_like(size: usize) -> Vec<u8> {
        let text = b"The quick brown fox jumps over the lazy dog. ";
        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            let remaining = size - data.len();
            let chunk_size = remaining.min(text.len());
            data.extend_from_slice(&text[..chunk_size]);
        }
        data
    }
}

fn bench_crc32_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32_sizes");
    for (name, size) in [("1KB", 1024), ("16KB", 16 * 1024), ("1MB", 1024 * 1024)] {
        let data = test_data::text_like(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| black_box(Crc32::compute(black_box(data))));
        });
    }
    group.finish();
}

fn bench_adler32_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32_sizes");
    for (name, size) in [("1KB", 1024), ("16KB", 16 * 1024), ("1MB", 1024 * 1024)] {
        let data = test_data::text_like(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| black_box(Adler32::checksum(black_box(data))));
        });
    }
    group.finish();
}

fn bench_crc32_incremental_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32_incremental");
    let size = 64 * 1024;
    let data = test_data::text_like(size);

    for chunk_size in [256, 1024, 4096, 16384] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("chunks_{chunk_size}")),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut crc = Crc32::new();
                    for chunk in data.chunks(chunk_size) {
                        crc.update(black_box(chunk));
                    }
                    black_box(crc.value())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_crc32_sizes,
    bench_adler32_sizes,
    bench_crc32_incremental_chunking,
);
criterion_main!(benches);
