//! Parallel implementation of batch queries

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::float_types::Real;
use crate::kdtree::KdTree;
use crate::kdtree::traits::BatchQueryOps;
use crate::location::Location;
use crate::metric::Metric;

/// Spreads queries over the rayon thread pool.
///
/// Searches only read the tree, so a shared `&KdTree` is enough; mutation
/// still needs exclusive access.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy)]
pub struct ParallelQueryOps {
    min_len: usize,
}

#[cfg(feature = "parallel")]
impl ParallelQueryOps {
    pub const fn new() -> Self {
        Self { min_len: 64 }
    }

    /// Queries are not split into jobs smaller than `min_len`
    pub const fn with_min_len(min_len: usize) -> Self {
        Self {
            min_len: if min_len == 0 { 1 } else { min_len },
        }
    }
}

#[cfg(feature = "parallel")]
impl Default for ParallelQueryOps {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "parallel")]
impl<const D: usize> BatchQueryOps<D> for ParallelQueryOps {
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
        queries
            .par_iter()
            .with_min_len(self.min_len)
            .map(|q| tree.nearest_vertex(metric, q))
            .collect()
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
            .par_iter()
            .with_min_len(self.min_len)
            .map(|q| tree.vertices_within(metric, q, max_distance2))
            .collect()
    }
}
