//! Distance metrics consumed by the nearest-vertex searches.
//!
//! A metric is supplied fresh for every query, so a caller can model a
//! sizing field that varies across the domain by building the metric of the
//! query location. The tree only needs two things from it: the squared
//! distance between two points, and the half-widths of the axis-aligned box
//! enclosing its unit ball, which turn a distance bound into an integer
//! pruning box.

use crate::errors::KdTreeError;
use crate::float_types::Real;
use nalgebra::{Point, SMatrix};

/// Distance function plus the shape of its unit ball.
pub trait Metric<const D: usize> {
    /// Squared distance between `a` and `b`.
    fn distance2(&self, a: &Point<Real, D>, b: &Point<Real, D>) -> Real;

    /// Half-widths of the axis-aligned box enclosing
    /// `{ x : distance2(0, x) <= 1 }`.
    fn unit_ball_bbox(&self) -> [Real; D];
}

impl<M: Metric<D> + ?Sized, const D: usize> Metric<D> for &M {
    #[inline]
    fn distance2(&self, a: &Point<Real, D>, b: &Point<Real, D>) -> Real {
        (**self).distance2(a, b)
    }

    #[inline]
    fn unit_ball_bbox(&self) -> [Real; D] {
        (**self).unit_ball_bbox()
    }
}

/// The usual Euclidean distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Euclidean;

impl<const D: usize> Metric<D> for Euclidean {
    #[inline]
    fn distance2(&self, a: &Point<Real, D>, b: &Point<Real, D>) -> Real {
        (b - a).norm_squared()
    }

    #[inline]
    fn unit_ball_bbox(&self) -> [Real; D] {
        [1.0; D]
    }
}

/// **Mathematical Foundation: Riemannian Metric Tensor**
///
/// A constant symmetric positive-definite matrix `M` defining
/// `d²(a, b) = (b - a)ᵀ M (b - a)`. Its unit ball is an ellipsoid whose
/// enclosing box has half-width `sqrt((M⁻¹)ₖₖ)` on axis `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorMetric<const D: usize> {
    matrix: SMatrix<Real, D, D>,
    half_widths: [Real; D],
}

impl<const D: usize> TensorMetric<D> {
    /// Build a metric from its tensor.
    ///
    /// Fails with [`KdTreeError::InvalidArgument`] unless `matrix` is
    /// symmetric positive-definite.
    pub fn new(matrix: SMatrix<Real, D, D>) -> Result<Self, KdTreeError> {
        if matrix.iter().any(|c| !c.is_finite()) {
            return Err(KdTreeError::InvalidArgument(
                "metric tensor has non-finite coefficients".to_string(),
            ));
        }
        if (matrix - matrix.transpose()).amax() > Real::EPSILON * matrix.amax() {
            return Err(KdTreeError::InvalidArgument(
                "metric tensor is not symmetric".to_string(),
            ));
        }
        let cholesky = matrix.cholesky().ok_or_else(|| {
            KdTreeError::InvalidArgument("metric tensor is not positive definite".to_string())
        })?;
        let inverse = cholesky.inverse();
        let half_widths = std::array::from_fn(|k| inverse[(k, k)].max(0.0).sqrt());
        Ok(Self {
            matrix,
            half_widths,
        })
    }

    /// Axis-aligned metric: a unit step along axis `k` has length `scales[k]`.
    pub fn diagonal(scales: [Real; D]) -> Result<Self, KdTreeError> {
        let squared = SMatrix::<Real, D, D>::from_fn(|r, c| {
            if r == c { scales[r] * scales[r] } else { 0.0 }
        });
        Self::new(squared)
    }

    /// The underlying tensor.
    pub const fn matrix(&self) -> &SMatrix<Real, D, D> {
        &self.matrix
    }
}

impl<const D: usize> Metric<D> for TensorMetric<D> {
    #[inline]
    fn distance2(&self, a: &Point<Real, D>, b: &Point<Real, D>) -> Real {
        let delta = b - a;
        delta.dot(&(self.matrix * delta))
    }

    #[inline]
    fn unit_ball_bbox(&self) -> [Real; D] {
        self.half_widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Point2, Point3};

    #[test]
    fn euclidean_distance() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 2.0, 2.0);
        assert_relative_eq!(Euclidean.distance2(&a, &b), 9.0);
        assert_eq!(Metric::<3>::unit_ball_bbox(&Euclidean), [1.0; 3]);
    }

    #[test]
    fn diagonal_metric_scales_axes() {
        let metric = TensorMetric::diagonal([1.0, 0.1]).expect("valid metric");
        let origin = Point2::origin();
        assert_relative_eq!(metric.distance2(&origin, &Point2::new(0.0, 10.0)), 1.0, epsilon = 1e-12);
        assert_relative_eq!(metric.distance2(&origin, &Point2::new(2.0, 0.0)), 4.0, epsilon = 1e-12);
        let bbox = metric.unit_ball_bbox();
        assert_relative_eq!(bbox[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(bbox[1], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn rotated_tensor_bbox_encloses_ellipse() {
        // Long axis along the diagonal x = y
        let m = Matrix2::new(0.505, -0.495, -0.495, 0.505);
        let metric = TensorMetric::new(m).expect("valid metric");
        let bbox = metric.unit_ball_bbox();
        for i in 0..360 {
            let angle = (i as Real).to_radians();
            let dir = Point2::new(angle.cos(), angle.sin());
            // Scale the direction to the boundary of the unit ball
            let d2 = metric.distance2(&Point2::origin(), &dir);
            let p = dir.coords / d2.sqrt();
            assert!(p.x.abs() <= bbox[0] * (1.0 + 1e-9));
            assert!(p.y.abs() <= bbox[1] * (1.0 + 1e-9));
        }
    }

    #[test]
    fn rejects_singular_tensor() {
        let m = Matrix2::new(1.0, 1.0, 1.0, 1.0);
        assert!(matches!(TensorMetric::new(m), Err(KdTreeError::InvalidArgument(_))));
        let m = Matrix2::new(1.0, 0.5, 0.0, 1.0);
        assert!(matches!(TensorMetric::new(m), Err(KdTreeError::InvalidArgument(_))));
    }
}
