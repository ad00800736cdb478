//! Batch query operations, so that serial and parallel strategies can be
//! swapped without touching the tree itself

use crate::float_types::Real;
use crate::kdtree::KdTree;
use crate::location::Location;
use crate::metric::Metric;

/// Runs many independent queries against one tree
pub trait BatchQueryOps<const D: usize> {
    /// Nearest stored vertex of every query point, in query order
    fn nearest_vertices<'a, T, M, Q>(
        &self,
        tree: &KdTree<'a, T, D>,
        metric: &M,
        queries: &[Q],
    ) -> Vec<Option<&'a T>>
    where
        T: Location<D> + Sync,
        M: Metric<D> + Sync + ?Sized,
        Q: Location<D> + Sync;

    /// Vertices within squared distance `max_distance2` of every query point
    fn vertices_within<'a, T, M, Q>(
        &self,
        tree: &KdTree<'a, T, D>,
        metric: &M,
        queries: &[Q],
        max_distance2: Real,
    ) -> Vec<Vec<&'a T>>
    where
        T: Location<D> + Sync,
        M: Metric<D> + Sync + ?Sized,
        Q: Location<D> + Sync;
}
