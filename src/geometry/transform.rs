use super::{LineSegment, Plane, Polygon, Ray, EPSILON};
use crate::utils::binary::{read_vec3, write_vec3};
use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::ops::Mul;

/// Affine transform: a linear part followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub matrix: DMat3,
    pub translation: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        matrix: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(matrix: DMat3, translation: DVec3) -> Self {
        Self {
            matrix,
            translation,
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            matrix: DMat3::IDENTITY,
            translation,
        }
    }

    pub fn from_rotation_translation(rotation: DQuat, translation: DVec3) -> Self {
        Self {
            matrix: DMat3::from_quat(rotation),
            translation,
        }
    }

    /// Rotation of `angle` radians about `axis`, then translation.
    pub fn from_axis_angle(axis: DVec3, angle: f64, translation: DVec3) -> Self {
        Self::from_rotation_translation(DQuat::from_axis_angle(axis.normalize(), angle), translation)
    }

    /// Inverse transform. Only meaningful when [`Transform::is_valid`] holds.
    pub fn inverse(&self) -> Transform {
        let matrix = self.matrix.inverse();
        Transform {
            matrix,
            translation: -(matrix * self.translation),
        }
    }

    /// All components finite and the linear part invertible.
    pub fn is_valid(&self) -> bool {
        self.matrix.is_finite()
            && self.translation.is_finite()
            && self.matrix.determinant().abs() > EPSILON
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.matrix * point + self.translation
    }

    pub fn transform_vector(&self, vector: DVec3) -> DVec3 {
        self.matrix * vector
    }

    /// Transforms a surface normal (inverse transpose), renormalized.
    pub fn transform_normal(&self, normal: DVec3) -> DVec3 {
        (self.matrix.inverse().transpose() * normal).normalize_or_zero()
    }

    pub fn transform_plane(&self, plane: &Plane) -> Plane {
        Plane::new(
            self.transform_point(plane.center),
            self.transform_normal(plane.unit_normal),
        )
    }

    pub fn transform_segment(&self, segment: &LineSegment) -> LineSegment {
        LineSegment::new(
            self.transform_point(segment.point_a),
            self.transform_point(segment.point_b),
        )
    }

    pub fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.transform_point(ray.origin),
            self.transform_vector(ray.unit_direction),
        )
    }

    pub fn transform_polygon(&self, polygon: &Polygon) -> Polygon {
        Polygon::new(
            polygon
                .vertices()
                .iter()
                .map(|vertex| self.transform_point(*vertex))
                .collect(),
        )
    }

    /// Writes the three matrix columns followed by the translation.
    pub fn dump<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        write_vec3(writer, self.matrix.x_axis)?;
        write_vec3(writer, self.matrix.y_axis)?;
        write_vec3(writer, self.matrix.z_axis)?;
        write_vec3(writer, self.translation)
    }

    pub fn restore<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        let x_axis = read_vec3(reader)?;
        let y_axis = read_vec3(reader)?;
        let z_axis = read_vec3(reader)?;
        let translation = read_vec3(reader)?;
        Ok(Self {
            matrix: DMat3::from_cols(x_axis, y_axis, z_axis),
            translation,
        })
    }
}

impl Mul for Transform {
    type Output = Transform;

    /// `a * b` applies `b` first, then `a`.
    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            matrix: self.matrix * rhs.matrix,
            translation: self.matrix * rhs.translation + self.translation,
        }
    }
}
