//! Metric-aware kd-tree: a quadtree in 2D, an octree in 3D.
//!
//! The tree locates mesh vertices near a query point, under a distance
//! metric supplied per query (possibly anisotropic). Vertices are borrowed:
//! the tree stores `&'a T` and never copies or moves them.
//!
//! Coordinates are quantized on an integer grid of `2^30` steps per axis,
//! computed once from a bounding box. Cell sizes are powers of two, so
//! locating a vertex only needs bit tests, and geometric predicates on
//! quantized coordinates are exact. The downside is that the bounding box
//! must be known before the first insertion.
//!
//! Each [`Cell`] holds either up to `bucket_size` vertices or `2^D` child
//! slots. A full leaf is split when one more vertex arrives; an emptied cell
//! is dropped from its parent. Cells do not store their position, it is
//! handed to visitors by [`KdTree::walk`].
//!
//! # Example
//! ```
//! use kdmesh::kdtree::QuadTree;
//! use kdmesh::metric::Euclidean;
//! use nalgebra::Point2;
//!
//! let points = [Point2::new(1.0, 1.0), Point2::new(1.0, 2.0), Point2::new(9.0, 9.0)];
//! let mut tree = QuadTree::from_bbox_with_bucket_size(&[0.0, 0.0, 10.0, 10.0], 2)?;
//! for p in &points {
//!     tree.add(p)?;
//! }
//! let nearest = tree.nearest_vertex(&Euclidean, &Point2::new(0.0, 0.0));
//! assert!(std::ptr::eq(nearest.unwrap(), &points[0]));
//! # Ok::<(), kdmesh::errors::KdTreeError>(())
//! ```

pub mod cell;
pub mod predicates;
pub mod quantizer;
pub mod search;
pub mod serial;
pub mod traits;
pub mod walk;

#[cfg(feature = "parallel")]
pub mod parallel;

pub use cell::Cell;
pub use quantizer::Quantizer;
pub use serial::SerialQueryOps;
pub use traits::BatchQueryOps;
pub use walk::{Vertices, WalkAction};

#[cfg(feature = "parallel")]
pub use parallel::ParallelQueryOps;

use crate::errors::KdTreeError;
use crate::float_types::{GRID_SIZE, MAX_LEVEL, MIN_BUCKET_SIZE, Real, default_bucket_size};
use crate::location::Location;
use crate::metric::Metric;
use cell::child_index;
use nalgebra::Point;
use smallvec::SmallVec;

/// Spatial index over borrowed vertices in `D` dimensions (`D` is 2 or 3).
///
/// Cloning copies the cell structure and shares the borrowed vertices.
#[derive(Debug)]
pub struct KdTree<'a, T, const D: usize> {
    root: Cell<'a, T>,
    quantizer: Option<Quantizer<D>>,
    bucket_size: usize,
    cell_count: usize,
}

impl<'a, T, const D: usize> Clone for KdTree<'a, T, D> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            quantizer: self.quantizer,
            bucket_size: self.bucket_size,
            cell_count: self.cell_count,
        }
    }
}

/// Kd-tree over 2D vertices.
pub type QuadTree<'a, T> = KdTree<'a, T, 2>;

/// Kd-tree over 3D vertices.
pub type Octree<'a, T> = KdTree<'a, T, 3>;

impl<'a, T, const D: usize> Default for KdTree<'a, T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, const D: usize> KdTree<'a, T, D> {
    const VALID_DIMENSION: () = assert!(D == 2 || D == 3, "KdTree dimension must be 2 or 3");

    /// Create an empty tree with the default bucket size.
    ///
    /// [`setup`](Self::setup) must be called before adding vertices.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_DIMENSION;
        let bucket_size = default_bucket_size();
        Self {
            root: Cell::new_leaf(bucket_size),
            quantizer: None,
            bucket_size,
            cell_count: 1,
        }
    }

    /// Create an empty tree storing at most `bucket_size` vertices per leaf.
    pub fn with_bucket_size(bucket_size: usize) -> Result<Self, KdTreeError> {
        if bucket_size < MIN_BUCKET_SIZE {
            return Err(KdTreeError::InvalidArgument(format!(
                "bucket size must be at least {}, got {}",
                MIN_BUCKET_SIZE, bucket_size
            )));
        }
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_DIMENSION;
        Ok(Self {
            root: Cell::new_leaf(bucket_size),
            quantizer: None,
            bucket_size,
            cell_count: 1,
        })
    }

    /// Create a tree covering `bbox` (lower corner followed by upper corner).
    pub fn from_bbox(bbox: &[Real]) -> Result<Self, KdTreeError> {
        let mut tree = Self::new();
        tree.setup(bbox)?;
        Ok(tree)
    }

    /// Create a tree covering `bbox` with an explicit bucket size.
    pub fn from_bbox_with_bucket_size(bbox: &[Real], bucket_size: usize) -> Result<Self, KdTreeError> {
        let mut tree = Self::with_bucket_size(bucket_size)?;
        tree.setup(bbox)?;
        Ok(tree)
    }

    /// Computes the integer <-> real conversion adapted to this bounding box.
    ///
    /// May be called again while the tree is empty; fails with
    /// [`KdTreeError::InvalidArgument`] once it holds vertices, because their
    /// quantized coordinates would no longer match.
    pub fn setup(&mut self, bbox: &[Real]) -> Result<(), KdTreeError> {
        if !self.is_empty() {
            return Err(KdTreeError::InvalidArgument(
                "KdTree::setup() cannot be called after vertices have been added".to_string(),
            ));
        }
        let quantizer = Quantizer::from_bbox(bbox)?;
        tracing::debug!(
            scale = quantizer.scale(),
            origin = ?quantizer.origin(),
            bbox = ?bbox,
            "new KdTree int <-> real conversion"
        );
        self.quantizer = Some(quantizer);
        Ok(())
    }

    /// Whether [`setup`](Self::setup) has been called.
    pub const fn is_setup(&self) -> bool {
        self.quantizer.is_some()
    }

    /// The coordinate quantizer, once the tree has been set up.
    pub const fn quantizer(&self) -> Option<&Quantizer<D>> {
        self.quantizer.as_ref()
    }

    /// Maximal number of vertices in a leaf.
    pub const fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Number of live cells, the root included.
    pub const fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Number of stored vertices.
    pub fn len(&self) -> usize {
        self.root.count()
    }

    /// Whether no vertex is stored.
    pub fn is_empty(&self) -> bool {
        self.root.count() == 0
    }

    /// The root cell.
    pub const fn root(&self) -> &Cell<'a, T> {
        &self.root
    }

    fn require_quantizer(&self) -> Result<Quantizer<D>, KdTreeError> {
        self.quantizer.ok_or(KdTreeError::NotInitialized)
    }

    /// Integer grid coordinates of a location.
    pub fn to_grid<P: Location<D> + ?Sized>(&self, p: &P) -> Result<[u32; D], KdTreeError> {
        self.require_quantizer()?.to_grid(&p.position())
    }

    /// Real coordinates of integer grid coordinates.
    pub fn from_grid(&self, ijk: &[u32; D]) -> Result<Point<Real, D>, KdTreeError> {
        Ok(self.require_quantizer()?.to_real(ijk))
    }

    /// Real coordinates of the centre of the grid.
    pub fn center(&self) -> Option<Point<Real, D>> {
        self.quantizer.map(|q| q.to_real(&[GRID_SIZE / 2; D]))
    }

    /// Leaf whose region contains `ijk`, if that region is populated.
    fn find_leaf(&self, ijk: &[u32; D]) -> Option<&Cell<'a, T>> {
        let mut current = &self.root;
        let mut size = GRID_SIZE;
        while !current.is_leaf() {
            size >>= 1;
            current = current.child(child_index(ijk, size))?;
        }
        Some(current)
    }

    /// Whether this exact vertex (compared by address) is stored.
    pub fn contains(&self, vertex: &T) -> bool
    where
        T: Location<D>,
    {
        let Some(quantizer) = self.quantizer else {
            return false;
        };
        let Ok(ijk) = quantizer.to_grid(&vertex.position()) else {
            return false;
        };
        self.find_leaf(&ijk)
            .is_some_and(|leaf| leaf.vertices().iter().any(|v| std::ptr::eq(*v, vertex)))
    }

    /// Checks that a vertex at `ijk` can be inserted without running out of
    /// grid levels.
    fn check_insertion(&self, quantizer: &Quantizer<D>, ijk: &[u32; D]) -> Result<(), KdTreeError>
    where
        T: Location<D>,
    {
        let mut current = &self.root;
        let mut size = GRID_SIZE;
        while !current.is_leaf() {
            size >>= 1;
            match current.child(child_index(ijk, size)) {
                Some(child) => current = child,
                None => return Ok(()),
            }
        }
        if current.count() < self.bucket_size {
            return Ok(());
        }
        // The new vertex lands in a full leaf after every split as long as
        // all occupants share its child slot.
        let occupants: SmallVec<[[u32; D]; 16]> = current
            .vertices()
            .iter()
            .map(|v| quantizer.to_grid_clamped(&v.position()))
            .collect();
        loop {
            size >>= 1;
            if size == 0 {
                return Err(KdTreeError::GridExhausted { level: MAX_LEVEL });
            }
            let slot = child_index(ijk, size);
            if occupants.iter().any(|o| child_index(o, size) != slot) {
                return Ok(());
            }
        }
    }

    /// Add a vertex to the tree.
    ///
    /// Returns `true` if a full leaf had to be split. Fails without
    /// modifying the tree if it has not been set up, if the vertex lies
    /// outside the bounding box, or if it cannot be separated from the
    /// vertices already stored (coincident coordinates).
    pub fn add(&mut self, vertex: &'a T) -> Result<bool, KdTreeError>
    where
        T: Location<D>,
    {
        let quantizer = self.require_quantizer()?;
        let ijk = quantizer.to_grid(&vertex.position())?;
        self.check_insertion(&quantizer, &ijk)?;

        let bucket_size = self.bucket_size;
        let mut split = false;
        let mut size = GRID_SIZE;
        let mut current = &mut self.root;
        loop {
            if current.is_leaf() {
                if current.count() < bucket_size {
                    current.push_vertex(vertex);
                    break;
                }
                let created = current.split(size >> 1, &quantizer, bucket_size);
                self.cell_count += created;
                split = true;
                tracing::trace!(size, created, "split full cell");
            }
            let Some((total, children)) = current.node_parts_mut() else {
                unreachable!("a split cell is internal");
            };
            *total += 1;
            size >>= 1;
            let slot = &mut children[child_index(&ijk, size)];
            if slot.is_none() {
                self.cell_count += 1;
            }
            current = &mut **slot.get_or_insert_with(|| Box::new(Cell::new_leaf(bucket_size)));
        }
        Ok(split)
    }

    /// Remove a vertex from the tree.
    ///
    /// The vertex is matched by address, not by value. Fails with
    /// [`KdTreeError::NotFound`] without modifying the tree if it is absent.
    pub fn remove(&mut self, vertex: &T) -> Result<(), KdTreeError>
    where
        T: Location<D>,
    {
        let quantizer = self.require_quantizer()?;
        let ijk = quantizer
            .to_grid(&vertex.position())
            .map_err(|_| KdTreeError::NotFound)?;
        let present = self
            .find_leaf(&ijk)
            .is_some_and(|leaf| leaf.vertices().iter().any(|v| std::ptr::eq(*v, vertex)));
        if !present {
            return Err(KdTreeError::NotFound);
        }

        if self.root.count() == 1 {
            self.root = Cell::new_leaf(self.bucket_size);
            self.cell_count = 1;
            return Ok(());
        }
        let mut size = GRID_SIZE;
        let mut current = &mut self.root;
        loop {
            if current.is_leaf() {
                current.remove_vertex(vertex);
                break;
            }
            let Some((total, children)) = current.node_parts_mut() else {
                unreachable!("a non-leaf cell is internal");
            };
            *total -= 1;
            size >>= 1;
            let slot = &mut children[child_index(&ijk, size)];
            if slot.as_ref().map_or(0, |c| c.count()) <= 1 {
                // This vertex is the last one below the child
                if let Some(child) = slot.take() {
                    self.cell_count -= child.subtree_cell_count();
                }
                break;
            }
            let Some(child) = slot.as_deref_mut() else {
                break;
            };
            current = child;
        }
        Ok(())
    }
}

impl<'a, T: Location<D> + Sync, const D: usize> KdTree<'a, T, D> {
    /// Nearest stored vertex of every query point, in query order.
    /// Queries run on the rayon pool when the `parallel` feature is enabled.
    pub fn nearest_vertices<M, Q>(&self, metric: &M, queries: &[Q]) -> Vec<Option<&'a T>>
    where
        M: Metric<D> + Sync + ?Sized,
        Q: Location<D> + Sync,
    {
        #[cfg(not(feature = "parallel"))]
        let ops = SerialQueryOps::new();
        #[cfg(feature = "parallel")]
        let ops = ParallelQueryOps::new();

        ops.nearest_vertices(self, metric, queries)
    }
}
