//! The capability a stored element must expose: its Cartesian coordinates.

use crate::float_types::Real;
use nalgebra::Point;

/// Anything with a position in `D`-dimensional space can be stored in a
/// [`KdTree`](crate::kdtree::KdTree).
///
/// The tree only reads coordinates; it never moves or copies the element.
/// Coordinates must not change while the element is stored, otherwise
/// [`KdTree::remove`](crate::kdtree::KdTree::remove) will look for it in the
/// wrong cell.
pub trait Location<const D: usize> {
    /// Cartesian coordinates of this element.
    fn position(&self) -> Point<Real, D>;
}

impl<const D: usize> Location<D> for Point<Real, D> {
    #[inline]
    fn position(&self) -> Point<Real, D> {
        *self
    }
}

impl<const D: usize> Location<D> for [Real; D] {
    #[inline]
    fn position(&self) -> Point<Real, D> {
        Point::from(*self)
    }
}

impl<L: Location<D> + ?Sized, const D: usize> Location<D> for &L {
    #[inline]
    fn position(&self) -> Point<Real, D> {
        (**self).position()
    }
}

impl<L: Location<D> + ?Sized, const D: usize> Location<D> for Box<L> {
    #[inline]
    fn position(&self) -> Point<Real, D> {
        (**self).position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Point3};

    #[test]
    fn arrays_and_points_agree() {
        let p = Point3::new(1.0, -2.0, 3.5);
        let a: [Real; 3] = [1.0, -2.0, 3.5];
        assert_eq!(p.position(), a.position());
        assert_eq!((&p).position(), p);
        assert_eq!(Box::new(Point2::new(4.0, 5.0)).position(), Point2::new(4.0, 5.0));
    }
}
