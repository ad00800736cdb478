use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kdmesh::{Euclidean, Octree, QuadTree, TensorMetric, float_types::Real};
use nalgebra::{Point2, Point3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn points_2d(rng: &mut StdRng, n: usize) -> Vec<Point2<Real>> {
    (0..n).map(|_| Point2::new(rng.random(), rng.random())).collect()
}

fn points_3d(rng: &mut StdRng, n: usize) -> Vec<Point3<Real>> {
    (0..n)
        .map(|_| Point3::new(rng.random(), rng.random(), rng.random()))
        .collect()
}

fn bench_insertion(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let mut group = c.benchmark_group("add");
    for n in [1_000, 10_000, 100_000] {
        let points = points_2d(&mut rng, n);
        group.bench_with_input(BenchmarkId::new("quadtree", n), &points, |b, points| {
            b.iter(|| {
                let mut tree = QuadTree::from_bbox(&[0.0, 0.0, 1.0, 1.0]).unwrap();
                for p in points {
                    tree.add(p).unwrap();
                }
                black_box(tree.cell_count())
            })
        });
    }
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let points = points_2d(&mut rng, 100_000);
    let queries = points_2d(&mut rng, 1_000);
    let mut tree = QuadTree::from_bbox(&[0.0, 0.0, 1.0, 1.0]).unwrap();
    for p in &points {
        tree.add(p).unwrap();
    }
    let stretched = TensorMetric::diagonal([1.0, 10.0]).unwrap();

    let mut group = c.benchmark_group("nearest_2d");
    group.bench_function("euclidean", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(tree.nearest_vertex(&Euclidean, q));
            }
        })
    });
    group.bench_function("anisotropic", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(tree.nearest_vertex(&stretched, q));
            }
        })
    });
    group.bench_function("near_only", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(tree.near_vertex(&Euclidean, q));
            }
        })
    });
    group.finish();

    let points = points_3d(&mut rng, 100_000);
    let queries = points_3d(&mut rng, 1_000);
    let mut octree = Octree::from_bbox(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
    for p in &points {
        octree.add(p).unwrap();
    }
    c.bench_function("nearest_3d", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(octree.nearest_vertex(&Euclidean, q));
            }
        })
    });
}

criterion_group!(benches, bench_insertion, bench_nearest);
criterion_main!(benches);
