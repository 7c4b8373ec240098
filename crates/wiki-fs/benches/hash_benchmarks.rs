use criterion::{Criterion, black_box, criterion_group, criterion_main};
use wiki_fs::{NormalizedPath, hash_bytes, hash_text, io};
use tempfile::tempdir;

fn hash_benchmark(c: &mut Criterion) {
    let page = "# Heading\r\n\r\nSome paragraph text.   \r\n".repeat(2_000);
    c.bench_function("hash::hash_text (page)", |b| {
        b.iter(|| hash_text(black_box(&page)))
    });

    let blob = vec![0xAB_u8; 256 * 1024];
    c.bench_function("hash::hash_bytes (256 KiB)", |b| {
        b.iter(|| hash_bytes(black_box(&blob)))
    });
}

fn write_atomic_benchmark(c: &mut Criterion) {
    c.bench_function("io::write_atomic", |b| {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("page.md"));
        let content = "hello world".as_bytes();

        b.iter(|| {
            io::write_atomic(black_box(&path), black_box(content)).unwrap();
        })
    });
}

criterion_group!(benches, hash_benchmark, write_atomic_benchmark);
criterion_main!(benches);
