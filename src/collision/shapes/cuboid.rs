use super::RayHit;
use crate::geometry::{Aabb, DebugLine, Ray, Transform};
use crate::utils::binary::{read_vec3, write_vec3};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Tolerance used to decide which faces a ray hit point lies on.
const FACE_TOLERANCE: f64 = 1e-7;

/// Box centered on the object-space origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    pub half_extents: DVec3,
}

impl Default for BoxShape {
    fn default() -> Self {
        Self {
            half_extents: DVec3::ONE,
        }
    }
}

impl BoxShape {
    pub fn new(half_extents: DVec3) -> Self {
        Self { half_extents }
    }

    pub fn is_valid(&self) -> bool {
        self.half_extents.is_finite() && self.half_extents.cmpgt(DVec3::ZERO).all()
    }

    pub fn volume(&self) -> f64 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    /// The box in its own object space.
    pub fn local_box(&self) -> Aabb {
        Aabb::new(-self.half_extents, self.half_extents)
    }

    pub fn world_corners(&self, object_to_world: &Transform) -> [DVec3; 8] {
        self.local_box()
            .corners()
            .map(|corner| object_to_world.transform_point(corner))
    }

    pub(super) fn bounding_box(&self, object_to_world: &Transform) -> Aabb {
        Aabb::from_points(self.world_corners(object_to_world))
    }

    pub(super) fn contains_point(&self, world_to_object: &Transform, point: DVec3) -> bool {
        self.local_box()
            .contains_point(world_to_object.transform_point(point))
    }

    /// Casts in object space; corners and edges report the average of the faces they join.
    pub(super) fn ray_cast(
        &self,
        object_to_world: &Transform,
        world_to_object: &Transform,
        ray: &Ray,
    ) -> Option<RayHit> {
        let local_ray = world_to_object.transform_ray(ray);
        let local_box = self.local_box();
        let local_alpha = local_ray.cast_against_box(&local_box)?;
        let local_point = local_ray.point_at(local_alpha);

        let mut local_normal = DVec3::ZERO;
        for axis in 0..3 {
            if (local_point[axis] - local_box.max[axis]).abs() <= FACE_TOLERANCE {
                local_normal[axis] += 1.0;
            } else if (local_point[axis] - local_box.min[axis]).abs() <= FACE_TOLERANCE {
                local_normal[axis] -= 1.0;
            }
        }

        let point = object_to_world.transform_point(local_point);
        Some(RayHit {
            alpha: ray.origin.distance(point),
            point,
            normal: object_to_world.transform_normal(local_normal),
        })
    }

    pub(super) fn debug_lines(
        &self,
        object_to_world: &Transform,
        color: DVec3,
        lines: &mut Vec<DebugLine>,
    ) {
        lines.extend(self.local_box().edges().iter().map(|edge| DebugLine {
            segment: object_to_world.transform_segment(edge),
            color,
        }));
    }

    pub(super) fn dump<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        write_vec3(writer, self.half_extents)
    }

    pub(super) fn restore<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            half_extents: read_vec3(reader)?,
        })
    }
}
