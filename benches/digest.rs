use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use foldersync_lib::core::{Blake3Hasher, ContentHasher};
use std::io::Write;

fn bench_digest(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let hasher = Blake3Hasher::new();

    let mut group = c.benchmark_group("digest");
    for size in [4 * 1024, 1024 * 1024, 16 * 1024 * 1024] {
        let path = dir.path().join(format!("{size}.bin"));
        let mut file = std::fs::File::create(&path).unwrap();
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &path, |b, path| {
            b.iter(|| hasher.digest(black_box(path)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_digest);
criterion_main!(benches);
