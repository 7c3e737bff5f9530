use super::{DebugLine, LineSegment, Plane, PlaneSide, Ray, EPSILON};
use crate::config::{POINT_ON_POLYGON_TOLERANCE, POLYGON_CONVEXITY_TOLERANCE};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Planar polygon given by its vertices in winding order.
///
/// The winding determines the normal direction through the right hand rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<DVec3>,
}

impl Polygon {
    pub fn new(vertices: Vec<DVec3>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = LineSegment> + '_ {
        let count = self.vertices.len();
        (0..count).map(move |i| LineSegment::new(self.vertices[i], self.vertices[(i + 1) % count]))
    }

    /// Vertex average.
    pub fn center(&self) -> DVec3 {
        if self.vertices.is_empty() {
            return DVec3::ZERO;
        }
        self.vertices.iter().copied().sum::<DVec3>() / self.vertices.len() as f64
    }

    /// Plane through the center, normal averaged over the fan of triangles about the center.
    pub fn plane(&self) -> Plane {
        let center = self.center();
        let normal = self
            .edges()
            .filter_map(|edge| {
                (edge.point_a - center)
                    .cross(edge.point_b - center)
                    .try_normalize()
            })
            .sum::<DVec3>();
        Plane::new(center, normal)
    }

    pub fn area(&self) -> f64 {
        let center = self.center();
        self.edges()
            .map(|edge| (edge.point_a - center).cross(edge.point_b - center).length() * 0.5)
            .sum()
    }

    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= 3
            && self.vertices.iter().all(|vertex| vertex.is_finite())
            && self.plane().unit_normal != DVec3::ZERO
    }

    /// Every vertex on the plane and every turn bending the same way as the normal.
    pub fn is_convex(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        let plane = self.plane();
        let count = self.vertices.len();
        let planar = self
            .vertices
            .iter()
            .all(|vertex| plane.signed_distance_to(*vertex).abs() <= POLYGON_CONVEXITY_TOLERANCE);
        planar
            && (0..count).all(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % count];
                let c = self.vertices[(i + 2) % count];
                (b - a).cross(c - b).dot(plane.unit_normal) >= -POLYGON_CONVEXITY_TOLERANCE
            })
    }

    /// Splits into (back, front) pieces. Fails unless the plane properly cuts the polygon.
    pub fn split_against_plane(&self, plane: &Plane, thickness: f64) -> Option<(Polygon, Polygon)> {
        let sides: Vec<PlaneSide> = self
            .vertices
            .iter()
            .map(|vertex| plane.side(*vertex, thickness))
            .collect();
        if !sides.contains(&PlaneSide::Back) || !sides.contains(&PlaneSide::Front) {
            return None;
        }

        let mut back = Vec::new();
        let mut front = Vec::new();
        let count = self.vertices.len();
        for i in 0..count {
            let j = (i + 1) % count;
            let vertex = self.vertices[i];
            match sides[i] {
                PlaneSide::Back => back.push(vertex),
                PlaneSide::Front => front.push(vertex),
                PlaneSide::Neither => {
                    back.push(vertex);
                    front.push(vertex);
                }
            }

            let crosses = matches!(
                (sides[i], sides[j]),
                (PlaneSide::Back, PlaneSide::Front) | (PlaneSide::Front, PlaneSide::Back)
            );
            if crosses {
                let next = self.vertices[j];
                let distance_a = plane.signed_distance_to(vertex);
                let distance_b = plane.signed_distance_to(next);
                let t = distance_a / (distance_a - distance_b);
                let point = vertex + (next - vertex) * t;
                back.push(point);
                front.push(point);
            }
        }

        (back.len() >= 3 && front.len() >= 3).then(|| (Polygon::new(back), Polygon::new(front)))
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        self.contains_point_with_tolerance(point, POINT_ON_POLYGON_TOLERANCE)
    }

    /// Point lies on the polygon's plane and inside (or on) every edge.
    pub fn contains_point_with_tolerance(&self, point: DVec3, tolerance: f64) -> bool {
        let plane = self.plane();
        if plane.signed_distance_to(point).abs() > tolerance {
            return false;
        }
        self.edges().all(|edge| {
            let inward = plane.unit_normal.cross(edge.delta()).normalize_or_zero();
            (point - edge.point_a).dot(inward) >= -tolerance
        })
    }

    pub fn is_point_on_edge(&self, point: DVec3, tolerance: f64) -> bool {
        self.edges().any(|edge| edge.distance_to(point) <= tolerance)
    }

    pub fn closest_point_to(&self, point: DVec3) -> DVec3 {
        let projected = self.plane().closest_point_to(point);
        if self.contains_point(projected) {
            return projected;
        }
        self.edges()
            .map(|edge| edge.closest_point_to(point))
            .min_by(|a, b| a.distance_squared(point).total_cmp(&b.distance_squared(point)))
            .unwrap_or(projected)
    }

    /// Where the segment passes through the polygon, if it does.
    pub fn intersect_segment(&self, segment: &LineSegment) -> Option<DVec3> {
        let plane = self.plane();
        let distance_a = plane.signed_distance_to(segment.point_a);
        let distance_b = plane.signed_distance_to(segment.point_b);
        if distance_a * distance_b > 0.0 {
            return None;
        }
        let denominator = distance_a - distance_b;
        let point = if denominator.abs() < EPSILON {
            segment.point_a
        } else {
            segment.lerp(distance_a / denominator)
        };
        self.contains_point(point).then_some(point)
    }

    /// Alpha and surface normal (facing the ray) of the ray's hit. Rays starting on the
    /// polygon never hit it.
    pub fn ray_cast(&self, ray: &Ray) -> Option<(f64, DVec3)> {
        if self.contains_point(ray.origin) {
            return None;
        }
        let plane = self.plane();
        let alpha = ray.cast_against_plane(&plane)?;
        if !self.contains_point(ray.point_at(alpha)) {
            return None;
        }
        let normal = if plane.unit_normal.dot(ray.unit_direction) > 0.0 {
            -plane.unit_normal
        } else {
            plane.unit_normal
        };
        Some((alpha, normal))
    }

    pub fn debug_lines(&self, color: DVec3, lines: &mut Vec<DebugLine>) {
        lines.extend(self.edges().map(|segment| DebugLine { segment, color }));
    }
}
