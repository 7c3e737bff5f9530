use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Which side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    Back,
    Front,
    /// Within the thickness slab around the plane.
    Neither,
}

/// Plane through `center` with a unit normal pointing to its front side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub center: DVec3,
    pub unit_normal: DVec3,
}

impl Plane {
    pub fn new(center: DVec3, normal: DVec3) -> Self {
        Self {
            center,
            unit_normal: normal.normalize_or_zero(),
        }
    }

    pub fn signed_distance_to(&self, point: DVec3) -> f64 {
        (point - self.center).dot(self.unit_normal)
    }

    pub fn side(&self, point: DVec3, thickness: f64) -> PlaneSide {
        let distance = self.signed_distance_to(point);
        if distance < -thickness {
            PlaneSide::Back
        } else if distance > thickness {
            PlaneSide::Front
        } else {
            PlaneSide::Neither
        }
    }

    pub fn closest_point_to(&self, point: DVec3) -> DVec3 {
        point - self.unit_normal * self.signed_distance_to(point)
    }

    pub fn flipped(&self) -> Self {
        Self {
            center: self.center,
            unit_normal: -self.unit_normal,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.unit_normal.is_normalized()
    }
}
