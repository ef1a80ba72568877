use std::{path::PathBuf, time::Duration};

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use perf_baseline::BaselineStore;
use tempfile::TempDir;

const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);
const SCALES: &[usize] = &[10, 1_000, 10_000];

struct StoreCase {
    _dir: TempDir,
    path: PathBuf,
    records: usize,
}

fn populated_store(records: usize) -> StoreCase {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(".perf-baseline");
    let mut store = BaselineStore::open(&path).expect("store");
    for i in 0..records {
        store
            .insert_if_absent(&format!("bench::case_{i:06}"), 1e-6 * (i + 1) as f64)
            .expect("insert");
    }
    StoreCase {
        _dir: dir,
        path,
        records,
    }
}

fn bench_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_open");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for &records in SCALES {
        let case = populated_store(records);
        group.bench_function(BenchmarkId::from_parameter(case.records), |b| {
            b.iter(|| BaselineStore::open(&case.path).expect("open"));
        });
    }
    group.finish();
}

fn bench_insert_new(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_insert_new");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for &records in SCALES {
        let case = populated_store(records);
        let snapshot = std::fs::read(&case.path).expect("snapshot");
        group.bench_function(BenchmarkId::from_parameter(case.records), |b| {
            b.iter_batched(
                || {
                    std::fs::write(&case.path, &snapshot).expect("restore");
                    BaselineStore::open(&case.path).expect("open")
                },
                |mut store| store.insert_if_absent("bench::fresh", 0.5).expect("insert"),
                BatchSize::PerIteration,
            );
        });
    }
    group.finish();
}

fn bench_insert_existing(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_insert_existing");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for &records in SCALES {
        let case = populated_store(records);
        let mut store = BaselineStore::open(&case.path).expect("open");
        group.bench_function(BenchmarkId::from_parameter(case.records), |b| {
            b.iter(|| store.insert_if_absent("bench::case_000000", 9.0).expect("insert"));
        });
    }
    group.finish();
}

criterion_group!(
    name = store_benches;
    config = Criterion::default();
    targets = bench_open, bench_insert_new, bench_insert_existing
);
criterion_main!(store_benches);
