use super::RayHit;
use crate::geometry::{any_perpendicular, Aabb, DebugLine, LineSegment, Ray, Transform, EPSILON};
use crate::utils::binary::{read_f64, read_vec3, write_f64, write_vec3};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::io::{Read, Write};

const RING_SEGMENTS: usize = 16;

/// Every point within `radius` of an object-space spine segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapsuleShape {
    pub spine: LineSegment,
    pub radius: f64,
}

impl Default for CapsuleShape {
    fn default() -> Self {
        Self {
            spine: LineSegment::new(DVec3::new(0.0, -1.0, 0.0), DVec3::new(0.0, 1.0, 0.0)),
            radius: 1.0,
        }
    }
}

impl CapsuleShape {
    pub fn new(point_a: DVec3, point_b: DVec3, radius: f64) -> Self {
        Self {
            spine: LineSegment::new(point_a, point_b),
            radius,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.spine.is_valid() && self.radius.is_finite() && self.radius > 0.0
    }

    pub fn volume(&self) -> f64 {
        PI * self.radius * self.radius * self.spine.length() + 4.0 / 3.0 * PI * self.radius.powi(3)
    }

    pub fn world_spine(&self, object_to_world: &Transform) -> LineSegment {
        object_to_world.transform_segment(&self.spine)
    }

    pub(super) fn bounding_box(&self, object_to_world: &Transform) -> Aabb {
        let spine = self.world_spine(object_to_world);
        let radius = DVec3::splat(self.radius);
        Aabb::new(
            spine.point_a.min(spine.point_b) - radius,
            spine.point_a.max(spine.point_b) + radius,
        )
    }

    pub(super) fn contains_point(&self, object_to_world: &Transform, point: DVec3) -> bool {
        self.world_spine(object_to_world).distance_to(point) <= self.radius
    }

    /// Nearest of the tube hit and the two end cap hits.
    pub(super) fn ray_cast(&self, object_to_world: &Transform, ray: &Ray) -> Option<RayHit> {
        let spine = self.world_spine(object_to_world);
        if spine.distance_to(ray.origin) <= self.radius {
            return None;
        }

        let mut best: Option<f64> = None;
        let mut keep = |alpha: f64| {
            if alpha >= 0.0 && best.map_or(true, |current| alpha < current) {
                best = Some(alpha);
            }
        };

        let axis = spine.delta();
        let length = axis.length();
        if length > EPSILON {
            let axis = axis / length;
            let offset = ray.origin - spine.point_a;
            let direction_perp = ray.unit_direction - axis * ray.unit_direction.dot(axis);
            let offset_perp = offset - axis * offset.dot(axis);
            let a = direction_perp.length_squared();
            let b = 2.0 * direction_perp.dot(offset_perp);
            let c = offset_perp.length_squared() - self.radius * self.radius;
            let discriminant = b * b - 4.0 * a * c;
            if a > EPSILON && discriminant >= 0.0 {
                let alpha = (-b - discriminant.sqrt()) / (2.0 * a);
                let along = (ray.point_at(alpha) - spine.point_a).dot(axis);
                if (0.0..=length).contains(&along) {
                    keep(alpha);
                }
            }
        }
        for cap in [spine.point_a, spine.point_b] {
            if let Some(alpha) = ray.cast_against_sphere(cap, self.radius) {
                keep(alpha);
            }
        }

        best.map(|alpha| {
            let point = ray.point_at(alpha);
            RayHit {
                alpha,
                point,
                normal: (point - spine.closest_point_to(point)).normalize_or_zero(),
            }
        })
    }

    pub(super) fn debug_lines(
        &self,
        object_to_world: &Transform,
        color: DVec3,
        lines: &mut Vec<DebugLine>,
    ) {
        let spine = self.world_spine(object_to_world);
        let axis = spine.delta().try_normalize().unwrap_or(DVec3::Y);
        let u = any_perpendicular(axis);
        let v = axis.cross(u);
        let ring = |center: DVec3, i: usize| {
            let angle = TAU * i as f64 / RING_SEGMENTS as f64;
            center + (u * angle.cos() + v * angle.sin()) * self.radius
        };

        for i in 0..RING_SEGMENTS {
            lines.push(DebugLine::new(ring(spine.point_a, i), ring(spine.point_a, i + 1), color));
            lines.push(DebugLine::new(ring(spine.point_b, i), ring(spine.point_b, i + 1), color));
        }
        for i in (0..RING_SEGMENTS).step_by(RING_SEGMENTS / 4) {
            lines.push(DebugLine::new(ring(spine.point_a, i), ring(spine.point_b, i), color));
        }

        // Half arcs over each cap.
        for (center, outward) in [(spine.point_a, -axis), (spine.point_b, axis)] {
            for side in [u, v] {
                let arc = |i: usize| {
                    let angle = PI * i as f64 / RING_SEGMENTS as f64;
                    center + (side * angle.cos() + outward * angle.sin()) * self.radius
                };
                for i in 0..RING_SEGMENTS {
                    lines.push(DebugLine::new(arc(i), arc(i + 1), color));
                }
            }
        }
    }

    pub(super) fn dump<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        write_vec3(writer, self.spine.point_a)?;
        write_vec3(writer, self.spine.point_b)?;
        write_f64(writer, self.radius)
    }

    pub(super) fn restore<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        let point_a = read_vec3(reader)?;
        let point_b = read_vec3(reader)?;
        let radius = read_f64(reader)?;
        Ok(Self::new(point_a, point_b, radius))
    }
}
