//! A **metric-aware spatial index** for mesh generation: a quadtree in 2D and
//! an octree in 3D, over vertices borrowed from the caller.
//!
//! Meshing algorithms insert vertices one by one and keep asking "which
//! existing vertex is nearest to this point?", where *nearest* is measured
//! by a local, possibly anisotropic [`Metric`]. The [`KdTree`] answers this
//! with a two-phase search: a cheap descent to a nearby vertex, then an
//! exact walk pruned by the box enclosing the metric ball.
//!
//! ```
//! use kdmesh::{Euclidean, QuadTree, TensorMetric};
//! use nalgebra::Point2;
//!
//! let points = [Point2::new(1.0, 2.5), Point2::new(2.5, 3.2), Point2::new(4.5, 4.5)];
//! let mut tree = QuadTree::from_bbox(&[0.0, 0.0, 5.0, 5.0])?;
//! for p in &points {
//!     tree.add(p)?;
//! }
//! let q = Point2::new(2.5, 2.5);
//! assert!(std::ptr::eq(tree.nearest_vertex(&Euclidean, &q).unwrap(), &points[1]));
//!
//! // Lengths along y count ten times more
//! let stretched = TensorMetric::diagonal([1.0, 10.0])?;
//! assert!(std::ptr::eq(tree.nearest_vertex(&stretched, &q).unwrap(), &points[0]));
//! # Ok::<(), kdmesh::KdTreeError>(())
//! ```
//!
//! # Features
//! #### Optional
//! - **parallel**: use rayon for batch queries, see [`kdtree::BatchQueryOps`]

#![forbid(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::all)]

pub mod errors;
pub mod float_types;
pub mod kdtree;
pub mod location;
pub mod metric;

pub use errors::KdTreeError;
pub use kdtree::{KdTree, Octree, QuadTree, WalkAction};
pub use location::Location;
pub use metric::{Euclidean, Metric, TensorMetric};
