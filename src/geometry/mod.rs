//! Double precision geometry primitives shared by the shape model, the tree and
//! the narrow phase calculators.

pub mod aabb;
pub mod plane;
pub mod polygon;
pub mod ray;
pub mod segment;
pub mod transform;

pub use aabb::Aabb;
pub use plane::{Plane, PlaneSide};
pub use polygon::Polygon;
pub use ray::Ray;
pub use segment::LineSegment;
pub use transform::Transform;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Lengths and denominators below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// A colored line segment emitted for debug visualization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebugLine {
    pub segment: LineSegment,
    pub color: DVec3,
}

impl DebugLine {
    pub fn new(point_a: DVec3, point_b: DVec3, color: DVec3) -> Self {
        Self {
            segment: LineSegment::new(point_a, point_b),
            color,
        }
    }
}

/// Returns any unit vector perpendicular to `v`.
pub fn any_perpendicular(v: DVec3) -> DVec3 {
    v.try_normalize()
        .map(|unit| unit.any_orthonormal_vector())
        .unwrap_or(DVec3::X)
}
