//! Serial implementation of batch queries

use crate::float_types::Real;
use crate::kdtree::KdTree;
use crate::kdtree::traits::BatchQueryOps;
use crate::location::Location;
use crate::metric::Metric;

/// Answers queries one after the other on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialQueryOps;

impl SerialQueryOps {
    pub const fn new() -> Self {
        Self
    }
}

impl<const D: usize> BatchQueryOps<D> for SerialQueryOps {
    fn nearest_vertices<'a, T, M, Q>(
        &self,
        tree: &KdTree<'a, T, D>,
        metric: &M,
        queries: &[Q],
    ) -> Vec<Option<&'a T>>
    where
        T: Location<D> + Sync,
        M: Metric<D> + Sync + ?Sized,
        Q: Location<D> + Sync,
    {
        queries.iter().map(|q| tree.nearest_vertex(metric, q)).collect()
    }

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
        Q: Location<D> + Sync,
    {
        queries
            .iter()
            .map(|q| tree.vertices_within(metric, q, max_distance2))
            .collect()
    }
}
