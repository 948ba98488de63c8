//! Benchmarks for normal estimation and signed distance queries

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tetrarecon_algorithms::{ManagerConfig, PointCloudManager};
use tetrarecon_core::Point3f;

fn generate_sphere(count: usize) -> Vec<Point3f> {
    // Fibonacci lattice
    let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            Point3f::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

fn bench_normal_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("normal_estimation");

    for &count in &[1_000usize, 5_000, 20_000] {
        let points = generate_sphere(count);
        group.bench_with_input(BenchmarkId::new("calc_normals", count), &points, |b, points| {
            b.iter(|| {
                let manager =
                    PointCloudManager::new(black_box(points.clone()), None, ManagerConfig::default())
                        .unwrap();
                black_box(manager.normals().len());
            });
        });
    }

    group.finish();
}

fn bench_distance(c: &mut Criterion) {
    let manager = PointCloudManager::new(generate_sphere(10_000), None, ManagerConfig::default()).unwrap();
    let queries = generate_sphere(500)
        .into_iter()
        .map(|p| Point3f::from(p.coords * 1.1))
        .collect::<Vec<_>>();

    c.bench_function("signed_distance_500", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(manager.distance(black_box(q)).ok());
            }
        });
    });
}

criterion_group!(benches, bench_normal_estimation, bench_distance);
criterion_main!(benches);
