//! Exact planar predicates on quantized coordinates.
//!
//! Coordinates are converted to the integer grid of the tree and all
//! arithmetic is done on `i64`. Grid coordinates are below `2^30`, so the
//! products below `2^61` never overflow and the sign of the results is
//! exact, which is what Delaunay-style algorithms need for robust sidedness
//! tests.

use crate::errors::KdTreeError;
use crate::kdtree::KdTree;
use crate::location::Location;

impl<'a, T, const D: usize> KdTree<'a, T, D> {
    fn planar_grid<P: Location<D> + ?Sized>(&self, p: &P, operation: &'static str) -> Result<[i64; 2], KdTreeError> {
        if D != 2 {
            return Err(KdTreeError::UnsupportedOperation(operation));
        }
        let ijk = self.to_grid(p)?;
        Ok([i64::from(ijk[0]), i64::from(ijk[1])])
    }

    /// Twice the signed area of the triangle `(p, a, b)`.
    ///
    /// Positive when `p` lies on the left of the oriented line `a -> b`,
    /// negative on its right, and zero when the three quantized points are
    /// collinear.
    ///
    /// # Errors
    /// [`KdTreeError::UnsupportedOperation`] on an octree,
    /// [`KdTreeError::NotInitialized`] before `setup`, and
    /// [`KdTreeError::OutOfBounds`] for a point outside the bounding box.
    pub fn on_left<P, A, B>(&self, p: &P, a: &A, b: &B) -> Result<i64, KdTreeError>
    where
        P: Location<D> + ?Sized,
        A: Location<D> + ?Sized,
        B: Location<D> + ?Sized,
    {
        const OPERATION: &str = "on_left is only available on quadtrees";
        let p = self.planar_grid(p, OPERATION)?;
        let a = self.planar_grid(a, OPERATION)?;
        let b = self.planar_grid(b, OPERATION)?;
        let (xa, ya) = (a[0] - p[0], a[1] - p[1]);
        let (xb, yb) = (b[0] - p[0], b[1] - p[1]);
        Ok(xa * yb - xb * ya)
    }

    /// Dot product of `a - p` and `b - p` on quantized coordinates.
    pub fn dot<P, A, B>(&self, p: &P, a: &A, b: &B) -> Result<i64, KdTreeError>
    where
        P: Location<D> + ?Sized,
        A: Location<D> + ?Sized,
        B: Location<D> + ?Sized,
    {
        const OPERATION: &str = "dot is only available on quadtrees";
        let p = self.planar_grid(p, OPERATION)?;
        let a = self.planar_grid(a, OPERATION)?;
        let b = self.planar_grid(b, OPERATION)?;
        Ok((a[0] - p[0]) * (b[0] - p[0]) + (a[1] - p[1]) * (b[1] - p[1]))
    }

    /// Squared euclidean distance between quantized coordinates of `a` and `b`.
    pub fn distance2<A, B>(&self, a: &A, b: &B) -> Result<i64, KdTreeError>
    where
        A: Location<D> + ?Sized,
        B: Location<D> + ?Sized,
    {
        const OPERATION: &str = "distance2 is only available on quadtrees";
        let a = self.planar_grid(a, OPERATION)?;
        let b = self.planar_grid(b, OPERATION)?;
        let (dx, dy) = (a[0] - b[0], a[1] - b[1]);
        Ok(dx * dx + dy * dy)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::KdTreeError;
    use crate::float_types::Real;
    use crate::kdtree::{Octree, QuadTree};
    use nalgebra::{Point2, Point3};

    fn tree() -> QuadTree<'static, Point2<Real>> {
        QuadTree::from_bbox(&[0.0, 0.0, 10.0, 10.0]).unwrap()
    }

    #[test]
    fn orientation_signs() {
        let tree = tree();
        let a = Point2::new(1.0, 1.0);
        let b = Point2::new(9.0, 1.0);
        assert!(tree.on_left(&Point2::new(5.0, 4.0), &a, &b).unwrap() > 0);
        assert!(tree.on_left(&Point2::new(5.0, 0.5), &a, &b).unwrap() < 0);
        assert_eq!(tree.on_left(&Point2::new(5.0, 1.0), &a, &b).unwrap(), 0);
        // Swapping the edge flips the sign
        let left = tree.on_left(&Point2::new(2.0, 3.0), &a, &b).unwrap();
        assert_eq!(tree.on_left(&Point2::new(2.0, 3.0), &b, &a).unwrap(), -left);
    }

    #[test]
    fn tiny_offsets_are_decided_exactly() {
        let tree = tree();
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(9.0, 9.0);
        // One grid step above the diagonal
        let step = 1.0 / tree.quantizer().unwrap().scale();
        let p = Point2::new(4.5, 4.5 + 2.0 * step);
        assert!(tree.on_left(&p, &a, &b).unwrap() > 0);
    }

    #[test]
    fn integer_distance_and_dot() {
        let tree = tree();
        let scale = tree.quantizer().unwrap().scale();
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        let d2 = tree.distance2(&a, &b).unwrap() as Real;
        assert!((d2.sqrt() / scale - 5.0).abs() < 1e-6);
        assert_eq!(tree.distance2(&b, &b).unwrap(), 0);
        let c = Point2::new(0.0, 5.0);
        assert_eq!(tree.dot(&a, &Point2::new(5.0, 0.0), &c).unwrap(), 0);
        assert!(tree.dot(&a, &b, &c).unwrap() > 0);
    }

    #[test]
    fn failures() {
        let p = Point2::new(1.0, 1.0);
        let unset: QuadTree<Point2<Real>> = QuadTree::new();
        assert_eq!(unset.distance2(&p, &p), Err(KdTreeError::NotInitialized));

        let outside = Point2::new(-1.0, 1.0);
        assert!(matches!(
            tree().on_left(&outside, &p, &p),
            Err(KdTreeError::OutOfBounds { axis: 0, .. })
        ));

        let octree: Octree<Point3<Real>> = Octree::from_bbox(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let q = Point3::new(0.5, 0.5, 0.5);
        assert!(matches!(
            octree.on_left(&q, &q, &q),
            Err(KdTreeError::UnsupportedOperation(_))
        ));
        assert!(matches!(octree.distance2(&q, &q), Err(KdTreeError::UnsupportedOperation(_))));
    }
}
