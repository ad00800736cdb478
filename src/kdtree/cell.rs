//! Kd-tree cell data structure

use crate::kdtree::quantizer::Quantizer;
use crate::location::Location;
use smallvec::SmallVec;

/// A cell of a [`KdTree`](crate::kdtree::KdTree), holding either a bucket of
/// vertices or `2^D` child slots.
///
/// Cells carry no locational information: their integer origin and size are
/// handed to walk visitors by the traversal instead.
#[derive(Debug)]
pub struct Cell<'a, T> {
    content: Content<'a, T>,
}

#[derive(Debug)]
enum Content<'a, T> {
    /// Borrowed vertices, at most `bucket_size` of them.
    Leaf(Vec<&'a T>),
    /// `total` is the number of vertices stored below this cell.
    Node {
        total: usize,
        children: Box<[Option<Box<Cell<'a, T>>>]>,
    },
}

// Clones the structure; the vertices stay borrowed.
impl<'a, T> Clone for Cell<'a, T> {
    fn clone(&self) -> Self {
        Self {
            content: self.content.clone(),
        }
    }
}

impl<'a, T> Clone for Content<'a, T> {
    fn clone(&self) -> Self {
        match self {
            Content::Leaf(vertices) => Content::Leaf(vertices.clone()),
            Content::Node { total, children } => Content::Node {
                total: *total,
                children: children.clone(),
            },
        }
    }
}

/// Index of the child slot containing integer coordinates `ijk`, for
/// children of side length `size`.
///
/// Cell sizes are powers of two, so bit `k` of the slot is the `size` bit of
/// the coordinate on axis `k`:
/// ```text
///      ┌───┬───┐
///  y≠0 │ 2 │ 3 │   with
///      ├───┼───┤    x = i & size
///  y=0 │ 0 │ 1 │    y = j & size
///      └───┴───┘
///      x=0  x≠0
/// ```
#[inline]
pub(crate) fn child_index<const D: usize>(ijk: &[u32; D], size: u32) -> usize {
    debug_assert!(size > 0);
    (0..D).fold(0, |slot, k| {
        if ijk[k] & size != 0 { slot | (1 << k) } else { slot }
    })
}

/// Integer origin of child `slot` of a cell whose origin is `origin`.
#[inline]
pub(crate) fn child_origin<const D: usize>(origin: &[u32; D], slot: usize, child_size: u32) -> [u32; D] {
    std::array::from_fn(|k| {
        if slot & (1 << k) != 0 { origin[k] + child_size } else { origin[k] }
    })
}

impl<'a, T> Cell<'a, T> {
    pub(crate) fn new_leaf(bucket_size: usize) -> Self {
        Self {
            content: Content::Leaf(Vec::with_capacity(bucket_size)),
        }
    }

    /// Whether this cell stores vertices rather than children.
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.content, Content::Leaf(_))
    }

    /// Number of vertices stored in or below this cell.
    #[inline]
    pub fn count(&self) -> usize {
        match &self.content {
            Content::Leaf(vertices) => vertices.len(),
            Content::Node { total, .. } => *total,
        }
    }

    /// Vertices of a leaf; empty for an internal cell.
    #[inline]
    pub fn vertices(&self) -> &[&'a T] {
        match &self.content {
            Content::Leaf(vertices) => vertices.as_slice(),
            Content::Node { .. } => &[],
        }
    }

    /// Child slots of an internal cell; empty for a leaf.
    #[inline]
    pub fn children(&self) -> &[Option<Box<Cell<'a, T>>>] {
        match &self.content {
            Content::Leaf(_) => &[],
            Content::Node { children, .. } => &children[..],
        }
    }

    /// Child in `slot`, if this cell is internal and the slot is occupied.
    #[inline]
    pub fn child(&self, slot: usize) -> Option<&Cell<'a, T>> {
        self.children().get(slot).and_then(|c| c.as_deref())
    }

    /// Number of cells in the subtree rooted here, this one included.
    pub fn subtree_cell_count(&self) -> usize {
        let mut stack: SmallVec<[&Cell<'a, T>; 32]> = SmallVec::new();
        stack.push(self);
        let mut count = 0;
        while let Some(cell) = stack.pop() {
            count += 1;
            stack.extend(cell.children().iter().filter_map(|c| c.as_deref()));
        }
        count
    }

    pub(crate) fn push_vertex(&mut self, vertex: &'a T) {
        match &mut self.content {
            Content::Leaf(vertices) => vertices.push(vertex),
            Content::Node { .. } => unreachable!("vertices are only pushed into leaves"),
        }
    }

    /// Removes `vertex` (compared by address) from a leaf bucket, keeping
    /// the order of the remaining vertices.
    pub(crate) fn remove_vertex(&mut self, vertex: &T) -> bool {
        if let Content::Leaf(vertices) = &mut self.content {
            if let Some(pos) = vertices.iter().position(|v| std::ptr::eq(*v, vertex)) {
                vertices.remove(pos);
                return true;
            }
        }
        false
    }

    /// Counters and child slots of an internal cell.
    pub(crate) fn node_parts_mut(&mut self) -> Option<(&mut usize, &mut [Option<Box<Cell<'a, T>>>])> {
        match &mut self.content {
            Content::Leaf(_) => None,
            Content::Node { total, children } => Some((total, &mut children[..])),
        }
    }

    /// Turns a leaf into an internal cell, moving its vertices into
    /// children of side `child_size`. Returns the number of cells created.
    pub(crate) fn split<const D: usize>(
        &mut self,
        child_size: u32,
        quantizer: &Quantizer<D>,
        bucket_size: usize,
    ) -> usize
    where
        T: Location<D>,
    {
        let Content::Leaf(vertices) = &mut self.content else {
            return 0;
        };
        let vertices = std::mem::take(vertices);
        let total = vertices.len();
        let mut children: Vec<Option<Box<Cell<'a, T>>>> = (0..1 << D).map(|_| None).collect();
        let mut created = 0;
        for vertex in vertices {
            let ijk = quantizer.to_grid_clamped(&vertex.position());
            let slot = &mut children[child_index(&ijk, child_size)];
            if slot.is_none() {
                created += 1;
            }
            slot.get_or_insert_with(|| Box::new(Cell::new_leaf(bucket_size)))
                .push_vertex(vertex);
        }
        self.content = Content::Node {
            total,
            children: children.into_boxed_slice(),
        };
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    #[test]
    fn child_index_uses_size_bit() {
        assert_eq!(child_index(&[0u32, 0], 4), 0);
        assert_eq!(child_index(&[4u32, 0], 4), 1);
        assert_eq!(child_index(&[0u32, 5], 4), 2);
        assert_eq!(child_index(&[7u32, 12], 4), 3);
        assert_eq!(child_index(&[0u32, 0, 4], 4), 4);
        assert_eq!(child_origin(&[8u32, 16], 3, 4), [12, 20]);
        assert_eq!(child_origin(&[8u32, 16, 0], 4, 2), [8, 16, 2]);
    }

    #[test]
    fn split_moves_all_vertices() {
        let quantizer = Quantizer::<2>::from_bbox(&[0.0, 0.0, 10.0, 10.0]).unwrap();
        let points = [
            Point2::new(1.0, 1.0),
            Point2::new(9.0, 1.0),
            Point2::new(1.0, 9.0),
            Point2::new(2.0, 2.0),
        ];
        let mut cell = Cell::new_leaf(4);
        for p in &points {
            cell.push_vertex(p);
        }
        assert!(cell.is_leaf());
        let created = cell.split(crate::float_types::GRID_SIZE >> 1, &quantizer, 4);
        assert_eq!(created, 3);
        assert!(!cell.is_leaf());
        assert_eq!(cell.count(), 4);
        assert!(cell.vertices().is_empty());
        assert_eq!(cell.child(0).map(Cell::count), Some(2));
        assert_eq!(cell.child(1).map(Cell::count), Some(1));
        assert_eq!(cell.child(2).map(Cell::count), Some(1));
        assert!(cell.child(3).is_none());
        assert_eq!(cell.subtree_cell_count(), 4);
    }

    #[test]
    fn remove_by_address() {
        let a = Point2::new(1.0, 1.0);
        let twin = Point2::new(1.0, 1.0);
        let b = Point2::new(2.0, 2.0);
        let mut cell = Cell::new_leaf(4);
        cell.push_vertex(&a);
        cell.push_vertex(&b);
        assert!(!cell.remove_vertex(&twin));
        assert!(cell.remove_vertex(&a));
        assert_eq!(cell.vertices().len(), 1);
        assert!(std::ptr::eq(cell.vertices()[0], &b));
    }
}
