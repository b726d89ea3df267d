//! Geometric helpers for reasoning about finished load plans.
//!
//! The shelf construction in the engine guarantees its own geometric
//! invariants; these functions re-derive placement extents so the plan audit
//! and the tests can verify them independently.

use crate::model::{CartonType, Container, PlacedItem};
use crate::types::{BoundingBox, Positioned, Vec3};

/// Computes the bounding box of a placed unit.
///
/// The unit's extent comes from its carton type; placements never rotate.
///
/// # Parameters
/// * `item` - The placed unit
/// * `carton` - The carton type the unit belongs to
pub fn placement_bounds(item: &PlacedItem, carton: &CartonType) -> BoundingBox {
    BoundingBox::from_position_and_dims(item.position(), carton.dims_as_vec3())
}

/// Computes the bounding box of the loading space, origin at (0, 0, 0).
pub fn container_bounds(container: &Container) -> BoundingBox {
    BoundingBox::from_position_and_dims(Vec3::zero(), container.dims_as_vec3())
}

/// Calculates the overlap of two intervals in one dimension.
///
/// # Parameters
/// * `a1` - Start of the first interval
/// * `a2` - End of the first interval
/// * `b1` - Start of the second interval
/// * `b2` - End of the second interval
///
/// # Returns
/// Length of the overlap, at least 0.0
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}
