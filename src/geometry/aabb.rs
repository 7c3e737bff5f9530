use super::{DebugLine, LineSegment, Plane};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box, inclusive of its boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

/// Corner index pairs forming the twelve box edges, see [`Aabb::corners`].
const EDGE_CORNERS: [(usize, usize); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Smallest box containing every point. Empty input yields an invalid box.
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        points.into_iter().fold(
            Self::new(DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |aabb, point| aabb.expanded_to(point),
        )
    }

    pub fn expanded_to(&self, point: DVec3) -> Self {
        Self::new(self.min.min(point), self.max.max(point))
    }

    pub fn merged(&self, other: &Aabb) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn dimensions(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn half_extents(&self) -> DVec3 {
        self.dimensions() * 0.5
    }

    pub fn volume(&self) -> f64 {
        let size = self.dimensions();
        size.x * size.y * size.z
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// True when `point` lies inside and at least `border` away from every face.
    pub fn contains_interior_point(&self, point: DVec3, border: f64) -> bool {
        (point - self.min).cmpgt(DVec3::splat(border)).all()
            && (self.max - point).cmpgt(DVec3::splat(border)).all()
    }

    pub fn is_point_on_surface(&self, point: DVec3, tolerance: f64) -> bool {
        let grown = Aabb::new(self.min - tolerance, self.max + tolerance);
        grown.contains_point(point) && !self.contains_interior_point(point, tolerance)
    }

    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        self.intersects(other)
            .then(|| Aabb::new(self.min.max(other.min), self.max.min(other.max)))
    }

    /// Halves the box across its longest axis.
    ///
    /// Returns the back (min side) half, the front half, and the dividing plane whose
    /// normal points from the back half into the front half.
    pub fn split(&self) -> (Aabb, Aabb, Plane) {
        let size = self.dimensions();
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };
        let middle = (self.min[axis] + self.max[axis]) * 0.5;

        let mut back = *self;
        back.max[axis] = middle;
        let mut front = *self;
        front.min[axis] = middle;

        let mut normal = DVec3::ZERO;
        normal[axis] = 1.0;
        (back, front, Plane::new(back.max, normal))
    }

    /// Corners ordered by bit index: bit 0 selects max x, bit 1 max y, bit 2 max z.
    pub fn corners(&self) -> [DVec3; 8] {
        std::array::from_fn(|i| {
            DVec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    pub fn edges(&self) -> [LineSegment; 12] {
        let corners = self.corners();
        EDGE_CORNERS.map(|(a, b)| LineSegment::new(corners[a], corners[b]))
    }

    /// Face planes with outward normals: -x, +x, -y, +y, -z, +z.
    pub fn side_planes(&self) -> [Plane; 6] {
        [
            Plane::new(self.min, DVec3::NEG_X),
            Plane::new(self.max, DVec3::X),
            Plane::new(self.min, DVec3::NEG_Y),
            Plane::new(self.max, DVec3::Y),
            Plane::new(self.min, DVec3::NEG_Z),
            Plane::new(self.max, DVec3::Z),
        ]
    }

    /// Closest point of the solid box; interior points map to themselves.
    pub fn closest_point_to(&self, point: DVec3) -> DVec3 {
        point.clamp(self.min, self.max)
    }

    /// Closest point on the box surface, also for points inside the box.
    pub fn closest_surface_point_to(&self, point: DVec3) -> DVec3 {
        if !self.contains_point(point) {
            return self.closest_point_to(point);
        }
        let to_min = point - self.min;
        let to_max = self.max - point;
        let mut best_axis = 0;
        let mut best_distance = f64::INFINITY;
        let mut use_max = false;
        for axis in 0..3 {
            if to_min[axis] < best_distance {
                best_distance = to_min[axis];
                best_axis = axis;
                use_max = false;
            }
            if to_max[axis] < best_distance {
                best_distance = to_max[axis];
                best_axis = axis;
                use_max = true;
            }
        }
        let mut surface = point;
        surface[best_axis] = if use_max {
            self.max[best_axis]
        } else {
            self.min[best_axis]
        };
        surface
    }

    pub fn debug_lines(&self, color: DVec3, lines: &mut Vec<DebugLine>) {
        lines.extend(self.edges().iter().map(|edge| DebugLine {
            segment: *edge,
            color,
        }));
    }
}
