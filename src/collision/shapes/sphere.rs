use super::RayHit;
use crate::geometry::{Aabb, DebugLine, Ray, Transform};
use crate::utils::binary::{read_f64, read_vec3, write_f64, write_vec3};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::io::{Read, Write};

const CIRCLE_SEGMENTS: usize = 24;

/// Sphere given by an object-space center and a radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereShape {
    pub center: DVec3,
    pub radius: f64,
}

impl Default for SphereShape {
    fn default() -> Self {
        Self {
            center: DVec3::ZERO,
            radius: 1.0,
        }
    }
}

impl SphereShape {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite() && self.radius > 0.0
    }

    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radius.powi(3)
    }

    pub fn world_center(&self, object_to_world: &Transform) -> DVec3 {
        object_to_world.transform_point(self.center)
    }

    pub(super) fn bounding_box(&self, object_to_world: &Transform) -> Aabb {
        Aabb::from_center_half_extents(
            self.world_center(object_to_world),
            DVec3::splat(self.radius),
        )
    }

    pub(super) fn contains_point(&self, object_to_world: &Transform, point: DVec3) -> bool {
        self.world_center(object_to_world).distance(point) <= self.radius
    }

    pub(super) fn ray_cast(&self, object_to_world: &Transform, ray: &Ray) -> Option<RayHit> {
        let center = self.world_center(object_to_world);
        let alpha = ray.cast_against_sphere(center, self.radius)?;
        let point = ray.point_at(alpha);
        Some(RayHit {
            alpha,
            point,
            normal: (point - center).normalize_or_zero(),
        })
    }

    pub(super) fn debug_lines(
        &self,
        object_to_world: &Transform,
        color: DVec3,
        lines: &mut Vec<DebugLine>,
    ) {
        let center = self.world_center(object_to_world);
        let axes = [
            (DVec3::X, DVec3::Y),
            (DVec3::Y, DVec3::Z),
            (DVec3::Z, DVec3::X),
        ];
        for (u, v) in axes {
            let point_on = |i: usize| {
                let angle = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                center + (u * angle.cos() + v * angle.sin()) * self.radius
            };
            for i in 0..CIRCLE_SEGMENTS {
                lines.push(DebugLine::new(point_on(i), point_on(i + 1), color));
            }
        }
    }

    pub(super) fn dump<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        write_vec3(writer, self.center)?;
        write_f64(writer, self.radius)
    }

    pub(super) fn restore<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        let center = read_vec3(reader)?;
        let radius = read_f64(reader)?;
        Ok(Self { center, radius })
    }
}
