//! Benchmarks for MemoryVfs operations.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use devterm_vfs::MemoryVfs;

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("vfs_write");

    let text_1k = "a".repeat(1_024);
    for n_files in [100, 1_000] {
        let paths: Vec<String> = (0..n_files).map(|i| format!("/data/file_{i}.txt")).collect();
        group.bench_function(BenchmarkId::new("write", n_files), |b| {
            b.iter(|| {
                let mut vfs = MemoryVfs::new();
                vfs.mkdir_all("/data").unwrap();
                for path in &paths {
                    vfs.write(path, &text_1k).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("vfs_list");

    for n_entries in [100, 1_000] {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir_all("/dir").unwrap();
        for i in 0..n_entries {
            vfs.write(&format!("/dir/file_{i}.txt"), "data").unwrap();
        }
        group.bench_function(BenchmarkId::new("list", n_entries), |b| {
            b.iter(|| vfs.list("/dir"));
        });
    }

    group.finish();
}

fn bench_rename_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("vfs_rename");

    for n_files in [10, 100] {
        group.bench_function(BenchmarkId::new("rename_dir", n_files), |b| {
            b.iter(|| {
                let mut vfs = MemoryVfs::new();
                vfs.mkdir_all("/src/nested").unwrap();
                for i in 0..n_files {
                    vfs.write(&format!("/src/nested/f{i}"), "x").unwrap();
                }
                vfs.rename("/src", "/dst").unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write, bench_list, bench_rename_tree);
criterion_main!(benches);
