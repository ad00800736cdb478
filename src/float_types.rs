// Our Real scalar type:
pub type Real = f64;

use core::str::FromStr;
use std::sync::OnceLock;

/// Number of halvings from the full grid down to a unit cell.
/// Integer coordinates must be widened if this grows past 30.
pub const MAX_LEVEL: usize = 30;

/// Side length of the integer grid addressed by the tree.
pub const GRID_SIZE: u32 = 1 << MAX_LEVEL;

/// Relative slack added to the largest bounding box extent so that points on
/// the upper boundary do not land exactly on the grid edge.
pub const BBOX_SLACK: Real = 1.01;

/// Relative slack applied to the integer pruning radius of nearest-vertex
/// searches, absorbing the truncation of quantized coordinates.
pub const PRUNING_SLACK: Real = 1.005;

/// Smallest bucket size accepted by [`KdTree`](crate::kdtree::KdTree).
/// Leaves and internal cells do not share storage, so any non-empty bucket works.
pub const MIN_BUCKET_SIZE: usize = 1;

/// Lazily-initialized default bucket size used by trees created without an
/// explicit one. Defaults to 10, but can be overridden:
///  1) **Build-time**: set env var `KDMESH_BUCKET_SIZE` (e.g. `KDMESH_BUCKET_SIZE=16 cargo build`)
///  2) **Runtime**: call [`set_default_bucket_size`] once before building any tree
static BUCKET_SIZE_CELL: OnceLock<usize> = OnceLock::new();

#[inline]
const fn fallback_bucket_size() -> usize {
    10
}

/// Returns the current default bucket size.
/// If not set yet, it tries `KDMESH_BUCKET_SIZE` and falls back to 10.
pub fn default_bucket_size() -> usize {
    *BUCKET_SIZE_CELL.get_or_init(|| {
        // Compile-time env if provided, inherited by dependencies
        if let Some(environment_variable) = option_env!("KDMESH_BUCKET_SIZE") {
            if let Ok(value) = usize::from_str(environment_variable) {
                return value.max(MIN_BUCKET_SIZE);
            }
        }
        fallback_bucket_size()
    })
}

/// Set the default bucket size programmatically once (subsequent calls are ignored).
/// Call near program start: `kdmesh::float_types::set_default_bucket_size(16);`
pub fn set_default_bucket_size(value: usize) {
    let _ = BUCKET_SIZE_CELL.set(value.max(MIN_BUCKET_SIZE));
}
