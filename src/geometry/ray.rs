use super::{Aabb, LineSegment, Plane, EPSILON};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Half-line starting at `origin`. Distances along it are called alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: DVec3,
    pub unit_direction: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            unit_direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from the segment's first point towards its second.
    pub fn from_segment(segment: &LineSegment) -> Self {
        Self::new(segment.point_a, segment.delta())
    }

    pub fn point_at(&self, alpha: f64) -> DVec3 {
        self.origin + self.unit_direction * alpha
    }

    pub fn is_valid(&self) -> bool {
        self.origin.is_finite() && self.unit_direction.is_normalized()
    }

    pub fn cast_against_plane(&self, plane: &Plane) -> Option<f64> {
        let denominator = plane.unit_normal.dot(self.unit_direction);
        if denominator.abs() < EPSILON {
            return None;
        }
        let alpha = plane.unit_normal.dot(plane.center - self.origin) / denominator;
        (alpha >= 0.0).then_some(alpha)
    }

    /// Parameters where the carrier line enters and leaves the box, boundaries inclusive.
    pub fn box_interval(&self, aabb: &Aabb) -> Option<(f64, f64)> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.unit_direction[axis];
            if direction.abs() < EPSILON {
                if origin < aabb.min[axis] || origin > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let t0 = (aabb.min[axis] - origin) / direction;
            let t1 = (aabb.max[axis] - origin) / direction;
            let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            if t_min > t_max {
                return None;
            }
        }
        Some((t_min, t_max))
    }

    /// Entry alpha of a ray starting outside the box.
    pub fn cast_against_box(&self, aabb: &Aabb) -> Option<f64> {
        if aabb.contains_point(self.origin) {
            return None;
        }
        let (t_min, _) = self.box_interval(aabb)?;
        (t_min >= 0.0).then_some(t_min)
    }

    /// Zero when the ray starts inside the box, otherwise its entry alpha.
    pub fn hits_or_starts_in(&self, aabb: &Aabb) -> Option<f64> {
        if aabb.contains_point(self.origin) {
            Some(0.0)
        } else {
            self.cast_against_box(aabb)
        }
    }

    /// Non-negative alphas at which the ray crosses the box surface, nearest first.
    pub fn box_crossings(&self, aabb: &Aabb) -> Vec<f64> {
        match self.box_interval(aabb) {
            Some((t_min, t_max)) if t_min >= 0.0 => {
                if (t_max - t_min).abs() < EPSILON {
                    vec![t_min]
                } else {
                    vec![t_min, t_max]
                }
            }
            Some((_, t_max)) if t_max >= 0.0 => vec![t_max],
            _ => Vec::new(),
        }
    }

    /// Entry alpha against a sphere the ray starts outside of.
    pub fn cast_against_sphere(&self, center: DVec3, radius: f64) -> Option<f64> {
        let offset = self.origin - center;
        let c = offset.length_squared() - radius * radius;
        if c <= 0.0 {
            return None;
        }
        let b = offset.dot(self.unit_direction);
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let alpha = -b - discriminant.sqrt();
        (alpha >= 0.0).then_some(alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_cast_reports_entry_distance() {
        let aabb = Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let ray = Ray::new(DVec3::new(-10.0, 0.0, 0.0), DVec3::X);
        assert_eq!(ray.cast_against_box(&aabb), Some(9.0));
        assert_eq!(ray.box_crossings(&aabb), vec![9.0, 11.0]);

        let inside = Ray::new(DVec3::ZERO, DVec3::X);
        assert_eq!(inside.cast_against_box(&aabb), None);
        assert_eq!(inside.hits_or_starts_in(&aabb), Some(0.0));
        assert_eq!(inside.box_crossings(&aabb), vec![1.0]);
    }

    #[test]
    fn grazing_rays_touch_box_faces() {
        let aabb = Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let ray = Ray::new(DVec3::new(-5.0, 1.0, 0.0), DVec3::X);
        assert_eq!(ray.cast_against_box(&aabb), Some(4.0));
        let miss = Ray::new(DVec3::new(-5.0, 1.5, 0.0), DVec3::X);
        assert!(miss.box_interval(&aabb).is_none());
    }

    #[test]
    fn sphere_and_plane_casts() {
        let ray = Ray::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);
        let alpha = ray.cast_against_sphere(DVec3::ZERO, 2.0).expect("should hit");
        assert!((alpha - 3.0).abs() < 1e-12);
        assert!(ray.cast_against_sphere(DVec3::new(0.0, 3.0, 0.0), 2.0).is_none());

        let plane = Plane::new(DVec3::new(0.0, 0.0, 1.0), DVec3::Z);
        assert_eq!(ray.cast_against_plane(&plane), Some(6.0));
        assert_eq!(ray.cast_against_plane(&Plane::new(DVec3::new(0.0, 0.0, -9.0), DVec3::Z)), None);
    }
}
