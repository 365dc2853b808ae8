//! Connector benchmarks
//!
//! - Series codec (JSON text and Arrow batches)
//! - Add/get round trips per backend
//! - Library listing

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hydrostore::codec::columnar::{batches_to_series, series_to_batch};
use hydrostore::codec::{decode_series, encode_series};
use hydrostore::{
    AnyConnector, Connector, DocumentConnector, Library, MemoryConnector, Metadata,
    ParquetConnector, PasConnector, Shape, TimeSeries,
};

/// Daily series of `n` values with a gap every 10th day
#[allow(clippy::cast_precision_loss)]
fn daily_series(n: usize) -> TimeSeries {
    let t0 = NaiveDate::from_ymd_opt(1980, 1, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let index = (0..n).map(|i| t0 + Duration::days(i as i64)).collect();
    let values = (0..n)
        .map(|i| if i % 10 == 0 { f64::NAN } else { (i as f64).sin() * 3.0 })
        .collect();
    TimeSeries::series(index, values).unwrap()
}

fn backends(dir: &std::path::Path) -> Vec<AnyConnector> {
    vec![
        MemoryConnector::new("bench").into(),
        PasConnector::new("bench", dir.join("pas")).unwrap().into(),
        DocumentConnector::new("bench", ":memory:").unwrap().into(),
        ParquetConnector::new("bench", dir.join("parquet")).unwrap().into(),
    ]
}

/// Benchmark JSON encode + decode of a series
fn bench_series_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_json");

    for size in [365, 3_650, 36_500].iter() {
        let series = daily_series(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let text = encode_series(&series, "head").unwrap();
                black_box(decode_series(&text, Some(Shape::Series)).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark Arrow batch conversion of a series
fn bench_series_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_batch");

    for size in [365, 3_650, 36_500].iter() {
        let series = daily_series(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let batch = series_to_batch(&series, "head").unwrap();
                black_box(batches_to_series(&[batch]).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark overwrite + read back on every backend
fn bench_add_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_get");
    let dir = tempfile::tempdir().unwrap();
    let series = daily_series(3_650);
    let meta = Metadata::new().with("x", 100.0).with("y", 200.0);

    for mut conn in backends(dir.path()) {
        let kind = conn.conn_type();
        conn.add_oseries(&series, "head", Some(&meta), false).unwrap();

        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            b.iter(|| {
                conn.add_oseries(&series, "head", Some(&meta), true).unwrap();
                black_box(conn.get_oseries("head").unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark listing a library of 200 items
fn bench_list_names(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_names");
    let dir = tempfile::tempdir().unwrap();
    let series = daily_series(10);

    for mut conn in backends(dir.path()) {
        let kind = conn.conn_type();
        for i in 0..200 {
            conn.add_stress(&series, &format!("stress_{i:03}"), None, None, false)
                .unwrap();
        }

        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            b.iter(|| black_box(conn.list_names(Library::Stresses).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_series_json,
    bench_series_batch,
    bench_add_get,
    bench_list_names
);
criterion_main!(benches);
