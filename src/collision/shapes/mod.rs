//! Convex collision primitives and the bookkeeping every shape carries: identity,
//! placement, revision tracking, and lazily derived world-space state.

pub mod capsule;
pub mod cuboid;
pub mod polygon;
pub mod sphere;

pub use capsule::CapsuleShape;
pub use cuboid::BoxShape;
pub use polygon::{PolygonShape, WorldPolygon};
pub use sphere::SphereShape;

use crate::collision::tree::NodeId;
use crate::config::{DEFAULT_DEBUG_COLOR, POLYGON_SPLIT_THICKNESS};
use crate::error::Result;
use crate::geometry::{Aabb, DebugLine, LineSegment, Plane, Polygon, Ray, Transform};
use crate::utils::binary::{read_vec3, write_vec3};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a shape in the collision world. Zero is never handed out.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ShapeId(u64);

impl ShapeId {
    pub const NULL: ShapeId = ShapeId(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out monotonically increasing shape IDs starting at 1.
#[derive(Debug)]
pub struct ShapeIdAllocator {
    next: AtomicU64,
}

impl Default for ShapeIdAllocator {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl ShapeIdAllocator {
    pub fn allocate(&self) -> ShapeId {
        ShapeId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shape kinds. The discriminant is the type ID written to dump files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere = 0,
    Box = 1,
    Capsule = 2,
    Polygon = 3,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Sphere,
        ShapeKind::Box,
        ShapeKind::Capsule,
        ShapeKind::Polygon,
    ];

    pub fn type_id(self) -> u32 {
        self as u32
    }

    pub fn from_type_id(type_id: u32) -> Option<Self> {
        Self::ALL.get(type_id as usize).copied()
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Object-space geometry of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeometry {
    Sphere(SphereShape),
    Box(BoxShape),
    Capsule(CapsuleShape),
    Polygon(PolygonShape),
}

impl ShapeGeometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeGeometry::Sphere(_) => ShapeKind::Sphere,
            ShapeGeometry::Box(_) => ShapeKind::Box,
            ShapeGeometry::Capsule(_) => ShapeKind::Capsule,
            ShapeGeometry::Polygon(_) => ShapeKind::Polygon,
        }
    }

    fn default_for(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Sphere => ShapeGeometry::Sphere(SphereShape::default()),
            ShapeKind::Box => ShapeGeometry::Box(BoxShape::default()),
            ShapeKind::Capsule => ShapeGeometry::Capsule(CapsuleShape::default()),
            ShapeKind::Polygon => ShapeGeometry::Polygon(PolygonShape::default()),
        }
    }
}

/// Where a ray met a shape's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    pub alpha: f64,
    pub point: DVec3,
    pub normal: DVec3,
}

#[derive(Debug, Clone)]
struct ShapeCache {
    world_to_object: Transform,
    bounding_box: Aabb,
    world_polygon: Option<WorldPolygon>,
}

/// A collision shape: geometry placed in the world by an object-to-world transform.
///
/// Derived world state is computed on first use and dropped whenever the transform or
/// geometry changes. Those changes also bump the revision number, which is what cached
/// pairwise results are validated against.
#[derive(Debug, Clone)]
pub struct Shape {
    id: ShapeId,
    object_to_world: Transform,
    debug_color: DVec3,
    user_flags: u64,
    revision: u64,
    geometry: ShapeGeometry,
    node: Option<NodeId>,
    cache: OnceCell<ShapeCache>,
}

impl Shape {
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            id: ShapeId::NULL,
            object_to_world: Transform::IDENTITY,
            debug_color: DVec3::from_array(DEFAULT_DEBUG_COLOR),
            user_flags: 0,
            revision: 0,
            geometry,
            node: None,
            cache: OnceCell::new(),
        }
    }

    /// Factory used when restoring dumps: a shape of the given kind with default geometry.
    pub fn create(kind: ShapeKind) -> Self {
        Self::new(ShapeGeometry::default_for(kind))
    }

    pub fn sphere(center: DVec3, radius: f64) -> Self {
        Self::new(ShapeGeometry::Sphere(SphereShape::new(center, radius)))
    }

    pub fn cuboid(half_extents: DVec3) -> Self {
        Self::new(ShapeGeometry::Box(BoxShape::new(half_extents)))
    }

    pub fn capsule(point_a: DVec3, point_b: DVec3, radius: f64) -> Self {
        Self::new(ShapeGeometry::Capsule(CapsuleShape::new(point_a, point_b, radius)))
    }

    pub fn polygon(vertices: Vec<DVec3>) -> Self {
        Self::new(ShapeGeometry::Polygon(PolygonShape::new(vertices)))
    }

    pub fn with_transform(mut self, object_to_world: Transform) -> Self {
        self.set_object_to_world(object_to_world);
        self
    }

    pub fn with_debug_color(mut self, color: DVec3) -> Self {
        self.debug_color = color;
        self
    }

    pub fn with_user_flags(mut self, user_flags: u64) -> Self {
        self.user_flags = user_flags;
        self
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ShapeId) {
        self.id = id;
    }

    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    pub fn geometry(&self) -> &ShapeGeometry {
        &self.geometry
    }

    /// Replaces the geometry; counts as a collision-relevant mutation.
    pub fn set_geometry(&mut self, geometry: ShapeGeometry) {
        self.geometry = geometry;
        self.invalidate();
    }

    pub fn object_to_world(&self) -> &Transform {
        &self.object_to_world
    }

    /// Moves the shape; counts as a collision-relevant mutation.
    pub fn set_object_to_world(&mut self, object_to_world: Transform) {
        self.object_to_world = object_to_world;
        self.invalidate();
    }

    pub fn debug_color(&self) -> DVec3 {
        self.debug_color
    }

    pub fn set_debug_color(&mut self, color: DVec3) {
        self.debug_color = color;
    }

    pub fn user_flags(&self) -> u64 {
        self.user_flags
    }

    pub fn set_user_flags(&mut self, user_flags: u64) {
        self.user_flags = user_flags;
    }

    /// True when a query filtering by `mask` should see this shape. A zero mask matches all.
    pub fn matches_mask(&self, mask: u64) -> bool {
        mask == 0 || self.user_flags & mask != 0
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeId>) {
        self.node = node;
    }

    fn invalidate(&mut self) {
        self.revision += 1;
        self.cache.take();
    }

    fn cache(&self) -> &ShapeCache {
        self.cache.get_or_init(|| {
            let world_polygon = match &self.geometry {
                ShapeGeometry::Polygon(shape) => Some(WorldPolygon::new(
                    self.object_to_world.transform_polygon(&shape.polygon),
                )),
                _ => None,
            };
            let bounding_box = match &self.geometry {
                ShapeGeometry::Sphere(sphere) => sphere.bounding_box(&self.object_to_world),
                ShapeGeometry::Box(cuboid) => cuboid.bounding_box(&self.object_to_world),
                ShapeGeometry::Capsule(capsule) => capsule.bounding_box(&self.object_to_world),
                ShapeGeometry::Polygon(_) => Aabb::from_points(
                    world_polygon
                        .iter()
                        .flat_map(|world| world.polygon.vertices().iter().copied()),
                ),
            };
            ShapeCache {
                world_to_object: self.object_to_world.inverse(),
                bounding_box,
                world_polygon,
            }
        })
    }

    pub fn world_to_object(&self) -> &Transform {
        &self.cache().world_to_object
    }

    /// World-space axis-aligned bounds.
    pub fn bounding_box(&self) -> &Aabb {
        &self.cache().bounding_box
    }

    pub fn world_polygon(&self) -> Option<&WorldPolygon> {
        self.cache().world_polygon.as_ref()
    }

    /// World center and radius of a sphere.
    pub fn world_sphere(&self) -> Option<(DVec3, f64)> {
        match &self.geometry {
            ShapeGeometry::Sphere(sphere) => {
                Some((sphere.world_center(&self.object_to_world), sphere.radius))
            }
            _ => None,
        }
    }

    /// World spine and radius of a capsule.
    pub fn world_capsule(&self) -> Option<(LineSegment, f64)> {
        match &self.geometry {
            ShapeGeometry::Capsule(capsule) => {
                Some((capsule.world_spine(&self.object_to_world), capsule.radius))
            }
            _ => None,
        }
    }

    pub fn as_box(&self) -> Option<&BoxShape> {
        match &self.geometry {
            ShapeGeometry::Box(cuboid) => Some(cuboid),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.object_to_world.is_valid()
            && match &self.geometry {
                ShapeGeometry::Sphere(sphere) => sphere.is_valid(),
                ShapeGeometry::Box(cuboid) => cuboid.is_valid(),
                ShapeGeometry::Capsule(capsule) => capsule.is_valid(),
                ShapeGeometry::Polygon(polygon) => polygon.is_valid(),
            }
    }

    /// Volume, or area for polygons.
    pub fn calc_size(&self) -> f64 {
        match &self.geometry {
            ShapeGeometry::Sphere(sphere) => sphere.volume(),
            ShapeGeometry::Box(cuboid) => cuboid.volume(),
            ShapeGeometry::Capsule(capsule) => capsule.volume(),
            ShapeGeometry::Polygon(polygon) => polygon.area(),
        }
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        match &self.geometry {
            ShapeGeometry::Sphere(sphere) => sphere.contains_point(&self.object_to_world, point),
            ShapeGeometry::Box(cuboid) => cuboid.contains_point(self.world_to_object(), point),
            ShapeGeometry::Capsule(capsule) => capsule.contains_point(&self.object_to_world, point),
            ShapeGeometry::Polygon(_) => self
                .world_polygon()
                .is_some_and(|world| world.polygon.contains_point(point)),
        }
    }

    /// Surface hit of the ray. Rays starting inside the shape report nothing.
    pub fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        match &self.geometry {
            ShapeGeometry::Sphere(sphere) => sphere.ray_cast(&self.object_to_world, ray),
            ShapeGeometry::Box(cuboid) => {
                cuboid.ray_cast(&self.object_to_world, self.world_to_object(), ray)
            }
            ShapeGeometry::Capsule(capsule) => capsule.ray_cast(&self.object_to_world, ray),
            ShapeGeometry::Polygon(_) => {
                let world = self.world_polygon()?;
                let (alpha, normal) = world.polygon.ray_cast(ray)?;
                Some(RayHit {
                    alpha,
                    point: ray.point_at(alpha),
                    normal,
                })
            }
        }
    }

    /// Cuts the shape in two along a world-space plane, returning (back, front).
    ///
    /// Only polygons can be split. The pieces carry this shape's placement, color and
    /// flags but no ID.
    pub fn split(&self, plane: &Plane) -> Option<(Shape, Shape)> {
        let ShapeGeometry::Polygon(shape) = &self.geometry else {
            return None;
        };
        let local_plane = self.world_to_object().transform_plane(plane);
        let (back, front) = shape
            .polygon
            .split_against_plane(&local_plane, POLYGON_SPLIT_THICKNESS)?;
        Some((self.piece(back), self.piece(front)))
    }

    fn piece(&self, polygon: Polygon) -> Shape {
        Shape::new(ShapeGeometry::Polygon(PolygonShape { polygon }))
            .with_transform(self.object_to_world)
            .with_debug_color(self.debug_color)
            .with_user_flags(self.user_flags)
    }

    pub fn debug_render(&self, lines: &mut Vec<DebugLine>) {
        let color = self.debug_color;
        match &self.geometry {
            ShapeGeometry::Sphere(sphere) => sphere.debug_lines(&self.object_to_world, color, lines),
            ShapeGeometry::Box(cuboid) => cuboid.debug_lines(&self.object_to_world, color, lines),
            ShapeGeometry::Capsule(capsule) => {
                capsule.debug_lines(&self.object_to_world, color, lines)
            }
            ShapeGeometry::Polygon(_) => {
                if let Some(world) = self.world_polygon() {
                    world.polygon.debug_lines(color, lines);
                    let tip = world.center + world.plane.unit_normal;
                    lines.push(DebugLine::new(world.center, tip, color));
                }
            }
        }
    }

    /// Writes the transform, the debug color, then the kind-specific fields.
    pub fn dump<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        self.object_to_world.dump(writer)?;
        write_vec3(writer, self.debug_color)?;
        match &self.geometry {
            ShapeGeometry::Sphere(sphere) => sphere.dump(writer)?,
            ShapeGeometry::Box(cuboid) => cuboid.dump(writer)?,
            ShapeGeometry::Capsule(capsule) => capsule.dump(writer)?,
            ShapeGeometry::Polygon(polygon) => polygon.dump(writer)?,
        }
        Ok(())
    }

    /// Inverse of [`Shape::dump`] for a shape already created with the right kind.
    pub fn restore<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        let object_to_world = Transform::restore(reader)?;
        self.debug_color = read_vec3(reader)?;
        let geometry = match self.kind() {
            ShapeKind::Sphere => ShapeGeometry::Sphere(SphereShape::restore(reader)?),
            ShapeKind::Box => ShapeGeometry::Box(BoxShape::restore(reader)?),
            ShapeKind::Capsule => ShapeGeometry::Capsule(CapsuleShape::restore(reader)?),
            ShapeKind::Polygon => ShapeGeometry::Polygon(PolygonShape::restore(reader)?),
        };
        self.object_to_world = object_to_world;
        self.set_geometry(geometry);
        Ok(())
    }
}
