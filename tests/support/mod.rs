//! Test support library
//! Provides point generators and reference searches for tests.
#![allow(dead_code)]

use kdmesh::{Location, Metric, float_types::Real};
use nalgebra::{Point2, Point3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic random generator, so that failures can be replayed.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// `n` points uniformly distributed in `[lower, upper]^2`.
pub fn random_points_2d(rng: &mut StdRng, n: usize, lower: Real, upper: Real) -> Vec<Point2<Real>> {
    (0..n)
        .map(|_| Point2::new(rng.random_range(lower..upper), rng.random_range(lower..upper)))
        .collect()
}

/// `n` points uniformly distributed in `[lower, upper]^3`.
pub fn random_points_3d(rng: &mut StdRng, n: usize, lower: Real, upper: Real) -> Vec<Point3<Real>> {
    (0..n)
        .map(|_| {
            Point3::new(
                rng.random_range(lower..upper),
                rng.random_range(lower..upper),
                rng.random_range(lower..upper),
            )
        })
        .collect()
}

/// Smallest distance from `query` to any of `points`, by linear scan.
pub fn brute_force_distance2<T, M, Q, const D: usize>(points: &[T], metric: &M, query: &Q) -> Option<Real>
where
    T: Location<D>,
    M: Metric<D>,
    Q: Location<D>,
{
    let q = query.position();
    points
        .iter()
        .map(|p| metric.distance2(&q, &p.position()))
        .min_by(|a, b| a.total_cmp(b))
}

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}
