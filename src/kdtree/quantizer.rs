//! Conversion between real coordinates and the integer grid of the tree.
//!
//! The grid has `GRID_SIZE = 2^MAX_LEVEL` integer steps per axis. A single
//! uniform scale is used on every axis, so integer distances stay
//! proportional to Euclidean ones.

use crate::errors::KdTreeError;
use crate::float_types::{BBOX_SLACK, GRID_SIZE, Real};
use nalgebra::Point;

/// Origin and scale of the real <-> integer mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer<const D: usize> {
    origin: [Real; D],
    scale: Real,
}

impl<const D: usize> Quantizer<D> {
    /// Computes a mapping adapted to this bounding box.
    ///
    /// `bbox` holds the lower corner followed by the upper corner, so its
    /// length must be `2 * D`.
    pub fn from_bbox(bbox: &[Real]) -> Result<Self, KdTreeError> {
        if bbox.len() != 2 * D {
            return Err(KdTreeError::InvalidArgument(format!(
                "bounding box must have {} coordinates, got {}",
                2 * D,
                bbox.len()
            )));
        }
        if bbox.iter().any(|c| !c.is_finite()) {
            return Err(KdTreeError::InvalidArgument(
                "bounding box has non-finite coordinates".to_string(),
            ));
        }
        let mut origin = [0.0; D];
        let mut max_delta: Real = 0.0;
        for k in 0..D {
            let delta = bbox[k + D] - bbox[k];
            if delta < 0.0 {
                return Err(KdTreeError::InvalidArgument(format!(
                    "bounding box upper corner is below lower corner on axis {}",
                    k
                )));
            }
            origin[k] = bbox[k];
            max_delta = max_delta.max(delta);
        }
        if max_delta <= 0.0 {
            return Err(KdTreeError::InvalidArgument(
                "bounding box has zero extent".to_string(),
            ));
        }
        Ok(Self {
            origin,
            scale: Real::from(GRID_SIZE) / (BBOX_SLACK * max_delta),
        })
    }

    /// Lower corner of the grid in real coordinates.
    pub const fn origin(&self) -> &[Real; D] {
        &self.origin
    }

    /// Number of integer steps per real unit.
    pub const fn scale(&self) -> Real {
        self.scale
    }

    /// Integer coordinates of `p`, failing if it lies outside the grid.
    pub fn to_grid(&self, p: &Point<Real, D>) -> Result<[u32; D], KdTreeError> {
        let mut ijk = [0u32; D];
        for k in 0..D {
            let value = ((p[k] - self.origin[k]) * self.scale).floor();
            // NaN fails both comparisons
            if !(value >= 0.0 && value < Real::from(GRID_SIZE)) {
                return Err(KdTreeError::OutOfBounds { axis: k, value: p[k] });
            }
            ijk[k] = value as u32;
        }
        Ok(ijk)
    }

    /// Integer coordinates of `p`, clamped into the grid.
    pub fn to_grid_clamped(&self, p: &Point<Real, D>) -> [u32; D] {
        std::array::from_fn(|k| {
            let value = ((p[k] - self.origin[k]) * self.scale).floor();
            // `as` saturates and maps NaN to 0
            (value as i64).clamp(0, i64::from(GRID_SIZE - 1)) as u32
        })
    }

    /// Integer coordinates of `p` without clamping, saturated to `i64`.
    pub fn to_grid_signed(&self, p: &Point<Real, D>) -> [i64; D] {
        std::array::from_fn(|k| ((p[k] - self.origin[k]) * self.scale).floor() as i64)
    }

    /// Real coordinates of the lower corner of integer cell `ijk`.
    pub fn to_real(&self, ijk: &[u32; D]) -> Point<Real, D> {
        Point::from(std::array::from_fn(|k| {
            self.origin[k] + Real::from(ijk[k]) / self.scale
        }))
    }
}
