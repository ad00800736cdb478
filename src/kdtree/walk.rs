//! Prefix-order traversal of kd-tree cells.
//!
//! Traversals never recurse: they keep an explicit stack which cannot grow
//! deeper than `MAX_LEVEL + 1` frames, however the vertices are clustered.

use crate::float_types::{GRID_SIZE, MAX_LEVEL};
use crate::kdtree::KdTree;
use crate::kdtree::cell::{Cell, child_origin};
use smallvec::SmallVec;

/// What a walk visitor wants to happen after visiting a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Descend into the children of this cell, if any.
    Continue,
    /// Do not descend into the children of this cell.
    SkipChildren,
    /// Stop the whole traversal now.
    Abort,
}

struct Frame<'t, 'a, T, const D: usize> {
    cell: &'t Cell<'a, T>,
    size: u32,
    origin: [u32; D],
    next_slot: usize,
}

type FrameStack<'t, 'a, T, const D: usize> = SmallVec<[Frame<'t, 'a, T, D>; MAX_LEVEL + 1]>;

/// Visits `start` and then its descendants in prefix order; children are
/// visited in slot order. Returns `false` if the visitor aborted.
pub(crate) fn walk_from<'t, 'a, T, F, const D: usize>(
    start: &'t Cell<'a, T>,
    size: u32,
    origin: [u32; D],
    visitor: &mut F,
) -> bool
where
    F: FnMut(&'t Cell<'a, T>, u32, &[u32; D]) -> WalkAction,
{
    match visitor(start, size, &origin) {
        WalkAction::Abort => return false,
        WalkAction::SkipChildren => return true,
        WalkAction::Continue if start.is_leaf() => return true,
        WalkAction::Continue => {}
    }
    let mut stack: FrameStack<'t, 'a, T, D> = SmallVec::new();
    stack.push(Frame {
        cell: start,
        size,
        origin,
        next_slot: 0,
    });
    while let Some(top) = stack.last_mut() {
        let cell: &'t Cell<'a, T> = top.cell;
        let first = top.next_slot;
        let next = cell.children()[first..]
            .iter()
            .enumerate()
            .find_map(|(offset, c)| c.as_deref().map(|child| (first + offset, child)));
        let Some((slot, child)) = next else {
            stack.pop();
            continue;
        };
        top.next_slot = slot + 1;
        let child_size = top.size >> 1;
        let child_origin = child_origin(&top.origin, slot, child_size);
        match visitor(child, child_size, &child_origin) {
            WalkAction::Abort => return false,
            WalkAction::Continue if !child.is_leaf() => {
                debug_assert!(stack.len() <= MAX_LEVEL);
                stack.push(Frame {
                    cell: child,
                    size: child_size,
                    origin: child_origin,
                    next_slot: 0,
                });
            }
            _ => {}
        }
    }
    true
}

/// Lazy iterator over the vertices of a tree, in prefix cell order.
pub struct Vertices<'t, 'a, T> {
    stack: SmallVec<[(&'t Cell<'a, T>, usize); MAX_LEVEL + 1]>,
    bucket: std::slice::Iter<'t, &'a T>,
}

impl<'t, 'a, T> Vertices<'t, 'a, T> {
    fn new(root: &'t Cell<'a, T>) -> Self {
        let mut stack = SmallVec::new();
        let bucket = if root.is_leaf() {
            root.vertices().iter()
        } else {
            stack.push((root, 0));
            <&'t [&'a T]>::default().iter()
        };
        Self { stack, bucket }
    }
}

impl<'t, 'a, T> Iterator for Vertices<'t, 'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(vertex) = self.bucket.next() {
                return Some(*vertex);
            }
            let top = self.stack.last_mut()?;
            let cell: &'t Cell<'a, T> = top.0;
            let slot = top.1;
            let children = cell.children();
            if slot >= children.len() {
                self.stack.pop();
                continue;
            }
            top.1 += 1;
            if let Some(child) = children[slot].as_deref() {
                if child.is_leaf() {
                    self.bucket = child.vertices().iter();
                } else {
                    self.stack.push((child, 0));
                }
            }
        }
    }
}

impl<'a, T, const D: usize> KdTree<'a, T, D> {
    /// Apply `visitor` to every cell in prefix order.
    ///
    /// The visitor receives the cell, its integer side length and the
    /// integer coordinates of its lower corner. Returns `true` if all cells
    /// were traversed, `false` if the visitor returned
    /// [`WalkAction::Abort`].
    ///
    /// # Example
    /// ```
    /// use kdmesh::kdtree::{QuadTree, WalkAction};
    /// use nalgebra::Point2;
    ///
    /// let points: Vec<_> = (0..20).map(|i| Point2::new(i as f64 * 0.4, 1.0)).collect();
    /// let mut tree = QuadTree::from_bbox(&[0.0, 0.0, 10.0, 10.0])?;
    /// for p in &points {
    ///     tree.add(p)?;
    /// }
    /// let mut leaves = 0;
    /// let complete = tree.walk(|cell, _size, _origin| {
    ///     if cell.is_leaf() {
    ///         leaves += 1;
    ///     }
    ///     WalkAction::Continue
    /// });
    /// assert!(complete);
    /// assert!(leaves > 1);
    /// # Ok::<(), kdmesh::errors::KdTreeError>(())
    /// ```
    pub fn walk<'t, F>(&'t self, mut visitor: F) -> bool
    where
        F: FnMut(&'t Cell<'a, T>, u32, &[u32; D]) -> WalkAction,
    {
        walk_from(&self.root, GRID_SIZE, [0; D], &mut visitor)
    }

    /// Iterator over all stored vertices.
    pub fn vertices(&self) -> Vertices<'_, 'a, T> {
        Vertices::new(&self.root)
    }

    /// All stored vertices, collected by a walk over the tree.
    ///
    /// The order follows the cells in prefix order and is not stable across
    /// insertions.
    pub fn get_all_vertices(&self, capacity: usize) -> Vec<&'a T> {
        let mut vertices = Vec::with_capacity(capacity);
        self.walk(|cell, _, _| {
            vertices.extend_from_slice(cell.vertices());
            WalkAction::Continue
        });
        vertices
    }

    /// Number of levels of the tree, `1` when only the root exists.
    pub fn max_level(&self) -> usize {
        let mut min_size = GRID_SIZE;
        let mut visited = 0usize;
        self.walk(|_, size, _| {
            visited += 1;
            min_size = min_size.min(size);
            WalkAction::Continue
        });
        tracing::debug!(visited, cells = self.cell_count, min_size, "computed minimal cell size");
        (GRID_SIZE / min_size).trailing_zeros() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float_types::Real;
    use crate::kdtree::QuadTree;
    use nalgebra::Point2;

    fn sample_points() -> Vec<Point2<Real>> {
        (0..40)
            .map(|i| Point2::new((i % 8) as Real + 0.5, (i / 8) as Real * 1.7 + 0.25))
            .collect()
    }

    #[test]
    fn walk_visits_every_cell_once() {
        let points = sample_points();
        let mut tree = QuadTree::from_bbox_with_bucket_size(&[0.0, 0.0, 10.0, 10.0], 4).unwrap();
        for p in &points {
            tree.add(p).unwrap();
        }
        let mut visited = 0;
        assert!(tree.walk(|_, _, _| {
            visited += 1;
            WalkAction::Continue
        }));
        assert_eq!(visited, tree.cell_count());
    }

    #[test]
    fn origins_and_sizes_are_consistent() {
        let points = sample_points();
        let mut tree = QuadTree::from_bbox_with_bucket_size(&[0.0, 0.0, 10.0, 10.0], 4).unwrap();
        for p in &points {
            tree.add(p).unwrap();
        }
        let quantizer = *tree.quantizer().unwrap();
        tree.walk(|cell, size, origin| {
            assert!(size.is_power_of_two());
            assert_eq!(origin[0] % size, 0);
            assert_eq!(origin[1] % size, 0);
            for v in cell.vertices() {
                let ijk = quantizer.to_grid(v).unwrap();
                assert!(ijk[0] >= origin[0] && ijk[0] - origin[0] < size);
                assert!(ijk[1] >= origin[1] && ijk[1] - origin[1] < size);
            }
            WalkAction::Continue
        });
    }

    #[test]
    fn iterator_matches_walk_order() {
        let points = sample_points();
        let mut tree = QuadTree::from_bbox_with_bucket_size(&[0.0, 0.0, 10.0, 10.0], 3).unwrap();
        for p in &points {
            tree.add(p).unwrap();
        }
        let walked = tree.get_all_vertices(points.len());
        let iterated: Vec<_> = tree.vertices().collect();
        assert_eq!(walked.len(), points.len());
        assert_eq!(walked.len(), iterated.len());
        assert!(walked.iter().zip(&iterated).all(|(a, b)| std::ptr::eq(*a, *b)));
    }

    #[test]
    fn max_level_of_root_only_tree() {
        let p = Point2::new(1.0, 1.0);
        let mut tree = QuadTree::from_bbox(&[0.0, 0.0, 10.0, 10.0]).unwrap();
        assert_eq!(tree.max_level(), 1);
        tree.add(&p).unwrap();
        assert_eq!(tree.max_level(), 1);
    }

    #[test]
    fn max_level_grows_with_splits() {
        let points = sample_points();
        let mut tree = QuadTree::from_bbox_with_bucket_size(&[0.0, 0.0, 10.0, 10.0], 2).unwrap();
        for p in &points {
            tree.add(p).unwrap();
        }
        assert!(tree.max_level() > 2);
    }
}
