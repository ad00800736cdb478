//! Vertex searches under a caller-supplied metric.
//!
//! **Nearest vertex in two phases**
//!
//! 1. [`KdTree::near_vertex`] descends to the leaf which would contain the
//!    query point, without backtracking, and returns the best vertex of that
//!    leaf. Nothing guarantees it is the nearest one.
//! 2. [`KdTree::nearest_vertex`] uses the distance to that vertex as the
//!    initial bound of a full walk. Cells which do not intersect the box
//!    enclosing the metric ball of the current bound are skipped, and the
//!    bound shrinks whenever a better vertex is found.
//!
//! The pruning box is derived from [`Metric::unit_ball_bbox`], so
//! anisotropic metrics prune anisotropically. It over-approximates the true
//! metric ball, which keeps the search exact while the box test stays in
//! integer arithmetic.

use crate::float_types::{GRID_SIZE, PRUNING_SLACK, Real};
use crate::kdtree::cell::{Cell, child_index, child_origin};
use crate::kdtree::walk::{WalkAction, walk_from};
use crate::kdtree::{KdTree, Quantizer};
use crate::location::Location;
use crate::metric::Metric;
use nalgebra::Point;

/// Beyond this radius every cell of the grid is inside the pruning box.
const MAX_PRUNING_RADIUS: i64 = i64::MAX / 4;

/// Integer half-widths of the box enclosing the metric ball of squared
/// radius `distance2`. `grid_per_unit[k]` converts a metric length into
/// integer steps along axis `k`.
fn pruning_radius<const D: usize>(distance2: Real, grid_per_unit: &[Real; D]) -> [i64; D] {
    let distance = distance2.max(0.0).sqrt();
    std::array::from_fn(|k| {
        let radius = (distance * grid_per_unit[k]).ceil();
        // NaN and overflow both end up unbounded
        if radius.is_finite() && radius < MAX_PRUNING_RADIUS as Real {
            radius as i64
        } else {
            MAX_PRUNING_RADIUS
        }
    })
}

/// Whether the cell `[origin, origin + size]` misses the box of half-widths
/// `radius` around `query`.
///
/// A saturated radius never prunes along its axis, since the query may itself
/// have been saturated by the conversion to `i64`.
#[inline]
fn outside_box<const D: usize>(query: &[i64; D], radius: &[i64; D], origin: &[u32; D], size: u32) -> bool {
    (0..D).any(|k| {
        if radius[k] >= MAX_PRUNING_RADIUS {
            return false;
        }
        let lo = i64::from(origin[k]);
        query[k] < lo - radius[k] || query[k] > lo + i64::from(size) + radius[k]
    })
}

/// Integer steps per metric unit length along each axis.
fn grid_per_unit<M: Metric<D> + ?Sized, const D: usize>(metric: &M, quantizer: &Quantizer<D>) -> [Real; D] {
    let ball = metric.unit_ball_bbox();
    std::array::from_fn(|k| PRUNING_SLACK * quantizer.scale() * ball[k].abs())
}

/// Best vertex of a leaf bucket.
fn nearest_in_bucket<'a, T, M, const D: usize>(
    vertices: &[&'a T],
    metric: &M,
    query: &Point<Real, D>,
) -> Option<(&'a T, Real)>
where
    T: Location<D>,
    M: Metric<D> + ?Sized,
{
    let mut best: Option<(&'a T, Real)> = None;
    for &vertex in vertices {
        let d = metric.distance2(query, &vertex.position());
        match best {
            Some((_, best_d)) if best_d <= d => {}
            _ => best = Some((vertex, d)),
        }
    }
    best
}

impl<'a, T: Location<D>, const D: usize> KdTree<'a, T, D> {
    /// Return a stored vertex near `query`.
    ///
    /// The leaf which would contain `query` is retrieved and its nearest
    /// vertex is returned. If that region is empty, the first populated leaf
    /// below the deepest existing ancestor is used instead. Vertices of other
    /// leaves may of course be nearer; the result is a good starting point for
    /// [`nearest_vertex`](Self::nearest_vertex).
    ///
    /// Returns `None` if the tree is empty.
    pub fn near_vertex<M, Q>(&self, metric: &M, query: &Q) -> Option<&'a T>
    where
        M: Metric<D> + ?Sized,
        Q: Location<D> + ?Sized,
    {
        self.near_vertex_with_distance(metric, &query.position())
            .map(|(vertex, _)| vertex)
    }

    fn near_vertex_with_distance<M>(&self, metric: &M, query: &Point<Real, D>) -> Option<(&'a T, Real)>
    where
        M: Metric<D> + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        let quantizer = self.quantizer?;
        let ijk = quantizer.to_grid_clamped(query);
        let mut current = &self.root;
        let mut size = GRID_SIZE;
        let mut origin = [0u32; D];
        let mut searched = 0usize;
        while !current.is_leaf() {
            searched += 1;
            let child_size = size >> 1;
            let slot = child_index(&ijk, child_size);
            match current.child(slot) {
                Some(child) => {
                    origin = child_origin(&origin, slot, child_size);
                    size = child_size;
                    current = child;
                }
                None => return self.near_vertex_in_subcells(current, size, origin, metric, query, searched),
            }
        }
        tracing::trace!(searched, cells = self.cell_count, "near vertex found in target leaf");
        nearest_in_bucket(current.vertices(), metric, query)
    }

    /// Best vertex of the first populated leaf below `ancestor`, in prefix
    /// order.
    fn near_vertex_in_subcells<M>(
        &self,
        ancestor: &Cell<'a, T>,
        size: u32,
        origin: [u32; D],
        metric: &M,
        query: &Point<Real, D>,
        mut searched: usize,
    ) -> Option<(&'a T, Real)>
    where
        M: Metric<D> + ?Sized,
    {
        let mut found = None;
        let mut first_leaf = |cell: &Cell<'a, T>, _: u32, _: &[u32; D]| {
            searched += 1;
            match nearest_in_bucket(cell.vertices(), metric, query) {
                Some(best) => {
                    found = Some(best);
                    WalkAction::Abort
                }
                None => WalkAction::Continue,
            }
        };
        walk_from(ancestor, size, origin, &mut first_leaf);
        tracing::trace!(searched, cells = self.cell_count, "near vertex found in sub-cells");
        found
    }

    /// Return the stored vertex nearest to `query` under `metric`.
    ///
    /// Ties are broken in favour of the vertex met first. Returns `None` if
    /// the tree is empty.
    pub fn nearest_vertex<M, Q>(&self, metric: &M, query: &Q) -> Option<&'a T>
    where
        M: Metric<D> + ?Sized,
        Q: Location<D> + ?Sized,
    {
        let query = query.position();
        let (seed, seed_distance) = self.near_vertex_with_distance(metric, &query)?;
        let quantizer = self.quantizer?;
        let ijk = quantizer.to_grid_signed(&query);
        let steps = grid_per_unit(metric, &quantizer);

        let mut nearest = seed;
        let mut best = seed_distance;
        let mut radius = pruning_radius(best, &steps);
        let mut searched = 0usize;
        self.walk(|cell, size, origin| {
            if outside_box(&ijk, &radius, origin, size) {
                return WalkAction::SkipChildren;
            }
            searched += 1;
            let mut updated = false;
            for &vertex in cell.vertices() {
                let d = metric.distance2(&query, &vertex.position());
                if d < best {
                    best = d;
                    nearest = vertex;
                    updated = true;
                }
            }
            if updated {
                radius = pruning_radius(best, &steps);
            }
            WalkAction::Continue
        });
        tracing::debug!(searched, cells = self.cell_count, distance2 = best, "nearest vertex search");
        Some(nearest)
    }

    /// Slow reference version of [`nearest_vertex`](Self::nearest_vertex)
    /// which inspects every leaf. Only meant for testing and debugging.
    pub fn nearest_vertex_brute_force<M, Q>(&self, metric: &M, query: &Q) -> Option<&'a T>
    where
        M: Metric<D> + ?Sized,
        Q: Location<D> + ?Sized,
    {
        let query = query.position();
        let (mut nearest, mut best) = self.near_vertex_with_distance(metric, &query)?;
        let mut searched = 0usize;
        self.walk(|cell, _, _| {
            searched += 1;
            for &vertex in cell.vertices() {
                let d = metric.distance2(&query, &vertex.position());
                if d < best {
                    best = d;
                    nearest = vertex;
                }
            }
            WalkAction::Continue
        });
        tracing::debug!(searched, cells = self.cell_count, distance2 = best, "(debug) nearest vertex search");
        Some(nearest)
    }

    /// All stored vertices `v` with `metric.distance2(query, v) <= max_distance2`.
    ///
    /// The order follows the cells in prefix order.
    pub fn vertices_within<M, Q>(&self, metric: &M, query: &Q, max_distance2: Real) -> Vec<&'a T>
    where
        M: Metric<D> + ?Sized,
        Q: Location<D> + ?Sized,
    {
        let mut result = Vec::new();
        let Some(quantizer) = self.quantizer else {
            return result;
        };
        if self.is_empty() || max_distance2.is_nan() || max_distance2 < 0.0 {
            return result;
        }
        let query = query.position();
        let ijk = quantizer.to_grid_signed(&query);
        let radius = pruning_radius(max_distance2, &grid_per_unit(metric, &quantizer));
        self.walk(|cell, size, origin| {
            if outside_box(&ijk, &radius, origin, size) {
                return WalkAction::SkipChildren;
            }
            for &vertex in cell.vertices() {
                if metric.distance2(&query, &vertex.position()) <= max_distance2 {
                    result.push(vertex);
                }
            }
            WalkAction::Continue
        });
        result
    }
}
