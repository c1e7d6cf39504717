//! Performance benchmarks for kml-query-lib
//!
//! Run with: cargo bench --package kml-query-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kml_query_lib::{Folder, Handle, KmlDocument, Placemark};
use std::hint::black_box;

/// Build a document with `folders` top-level folders, each holding a nested folder,
/// and `per_folder` placemarks spread over both levels.
fn generate_document(folders: usize, per_folder: usize) -> KmlDocument {
    let document = KmlDocument::new(Some("Benchmark".to_string()), None);
    for f in 0..folders {
        let folder = document
            .folders()
            .add(Folder::named(format!("Region {f}")))
            .unwrap();
        let nested = folder
            .folders()
            .add(Folder::named(format!("Region {f} / detail")))
            .unwrap();
        for i in 0..per_folder {
            let t = i as f64 / per_folder as f64;
            let lon = -0.5 + (f % 10) as f64 * 0.1 + t * 0.1;
            let lat = 51.0 + (f / 10) as f64 * 0.1 + (t * 20.0).sin() * 0.05;
            let name = if i % 7 == 0 {
                format!("Station {f}-{i}")
            } else {
                format!("Stop {f}-{i}")
            };
            let placemark = Placemark::named(name).with_coordinates((lon, lat)).unwrap();
            let target = if i % 2 == 0 { &folder } else { &nested };
            target.placemarks().add(placemark).unwrap();
        }
    }
    document
}

// ============================================================================
// Traversal
// ============================================================================

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");

    for folders in [10, 100] {
        let document = generate_document(folders, 100);
        group.throughput(Throughput::Elements((folders * 100) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(folders), &document, |b, doc| {
            b.iter(|| black_box(doc.placemarks().all(true)).count());
        });
    }

    group.finish();
}

// ============================================================================
// Filtering and ordering
// ============================================================================

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    let document = generate_document(50, 200);
    let placemarks = document.placemarks().all(true);
    group.throughput(Throughput::Elements(placemarks.len() as u64));

    group.bench_function("icontains_10k", |b| {
        b.iter(|| placemarks.filter([("name__icontains", "station")]).unwrap().count());
    });

    group.bench_function("regex_10k", |b| {
        b.iter(|| placemarks.filter([("name__regex", r"^Stop \d+-1")]).unwrap().count());
    });

    group.bench_function("order_by_latitude_10k", |b| {
        b.iter(|| placemarks.order_by("-latitude").unwrap().first());
    });

    group.finish();
}

// ============================================================================
// Geospatial predicates
// ============================================================================

fn bench_spatial(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial");

    let document = generate_document(50, 200);
    let placemarks = document.placemarks().all(true);
    group.throughput(Throughput::Elements(placemarks.len() as u64));

    group.bench_function("near_10k", |b| {
        b.iter(|| placemarks.near(-0.1, 51.5, 10.0).unwrap().count());
    });

    group.bench_function("within_bounds_10k", |b| {
        b.iter(|| {
            placemarks
                .within_bounds(51.6, 51.4, 0.0, -0.3)
                .unwrap()
                .count()
        });
    });

    let origin = Handle::new(Placemark::default().with_coordinates((0.0, 51.5)).unwrap());
    group.bench_function("distance_to_10k", |b| {
        b.iter(|| {
            let origin = origin.borrow();
            placemarks
                .iter()
                .filter_map(|p| origin.distance_to(&*p.borrow()))
                .sum::<f64>()
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_flatten, bench_filter, bench_spatial);

criterion_main!(benches);
