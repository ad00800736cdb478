//! Index errors

use crate::float_types::Real;
use std::fmt::Display;

/// All the possible failures of a [`KdTree`](crate::kdtree::KdTree) operation.
///
/// None of them leave the tree half-modified: mutations are validated before
/// any cell is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KdTreeError {
    /// (NotInitialized) `add` or `remove` was called before `setup`
    NotInitialized,
    /// (InvalidArgument) Bad bounding box, bad bucket size, or `setup` on a non-empty tree
    InvalidArgument(String),
    /// (NotFound) The vertex is not stored in the tree (compared by reference)
    NotFound,
    /// (GridExhausted) Vertices cannot be separated even at the finest grid level
    GridExhausted { level: usize },
    /// (OutOfBounds) A quantized coordinate falls outside the integer grid
    OutOfBounds { axis: usize, value: Real },
    /// (UnsupportedOperation) The operation is not available in this dimension
    UnsupportedOperation(&'static str),
}

impl Display for KdTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KdTreeError::NotInitialized => write!(f, "(NotInitialized) KdTree::setup() must be called before modifying the tree"),
            KdTreeError::InvalidArgument(reason) => write!(f, "(InvalidArgument) {}", reason),
            KdTreeError::NotFound => write!(f, "(NotFound) Vertex is not present and can not be deleted"),
            KdTreeError::GridExhausted { level } => write!(f, "(GridExhausted) Exceeded maximal number of levels ({}) for kd-trees", level),
            KdTreeError::OutOfBounds { axis, value } => write!(f, "(OutOfBounds) Coordinate {} on axis {} is outside of the tree bounding box", value, axis),
            KdTreeError::UnsupportedOperation(operation) => write!(f, "(UnsupportedOperation) {}", operation),
        }
    }
}
