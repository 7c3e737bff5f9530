use super::EPSILON;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Finite line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub point_a: DVec3,
    pub point_b: DVec3,
}

impl LineSegment {
    pub fn new(point_a: DVec3, point_b: DVec3) -> Self {
        Self { point_a, point_b }
    }

    pub fn delta(&self) -> DVec3 {
        self.point_b - self.point_a
    }

    pub fn length(&self) -> f64 {
        self.delta().length()
    }

    pub fn lerp(&self, t: f64) -> DVec3 {
        self.point_a + self.delta() * t
    }

    pub fn midpoint(&self) -> DVec3 {
        self.lerp(0.5)
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.point_b, self.point_a)
    }

    /// Parameter in `[0, 1]` of the point on the segment closest to `point`.
    pub fn closest_parameter_to(&self, point: DVec3) -> f64 {
        let delta = self.delta();
        let length_squared = delta.length_squared();
        if length_squared <= EPSILON * EPSILON {
            return 0.0;
        }
        ((point - self.point_a).dot(delta) / length_squared).clamp(0.0, 1.0)
    }

    pub fn closest_point_to(&self, point: DVec3) -> DVec3 {
        self.lerp(self.closest_parameter_to(point))
    }

    pub fn distance_to(&self, point: DVec3) -> f64 {
        self.closest_point_to(point).distance(point)
    }

    /// Shortest segment running from a point on `self` to a point on `other`.
    pub fn shortest_connector(&self, other: &LineSegment) -> LineSegment {
        let d1 = self.delta();
        let d2 = other.delta();
        let r = self.point_a - other.point_a;
        let a = d1.length_squared();
        let e = d2.length_squared();
        let f = d2.dot(r);

        let (s, t) = if a <= EPSILON && e <= EPSILON {
            (0.0, 0.0)
        } else if a <= EPSILON {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(r);
            if e <= EPSILON {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(d2);
                let denominator = a * e - b * b;
                let mut s = if denominator > EPSILON {
                    ((b * f - c * e) / denominator).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let mut t = (b * s + f) / e;
                if t < 0.0 {
                    t = 0.0;
                    s = (-c / a).clamp(0.0, 1.0);
                } else if t > 1.0 {
                    t = 1.0;
                    s = ((b - c) / a).clamp(0.0, 1.0);
                }
                (s, t)
            }
        };

        LineSegment::new(self.lerp(s), other.lerp(t))
    }

    pub fn distance_to_segment(&self, other: &LineSegment) -> f64 {
        self.shortest_connector(other).length()
    }

    pub fn is_valid(&self) -> bool {
        self.point_a.is_finite() && self.point_b.is_finite()
    }
}
