//! Pairwise collision calculators, dispatched through a fixed `[kind_a][kind_b]` matrix.
//!
//! Every calculator reports a separation delta that moves its *first* shape off the
//! second. Mirrored pairs call the forward calculator and flip the result.

use crate::collision::cache::ShapePairCollisionStatus;
use crate::collision::shapes::{BoxShape, Shape, ShapeKind};
use crate::config::{BOX_BOX_MAX_ITERATIONS, BOX_FEATURE_THRESHOLD, SPHERE_BOX_AXIS_BORDER};
use crate::error::{CollisionError, Result};
use crate::geometry::{any_perpendicular, Aabb, LineSegment, Ray, Transform, EPSILON};
use glam::DVec3;
use log::{debug, warn};
use std::cmp::Ordering;

/// Computes the collision status of two shapes of fixed kinds.
///
/// Returns `None` only when handed shapes of the wrong kinds.
pub type CollisionCalculator = fn(&Shape, &Shape) -> Option<ShapePairCollisionStatus>;

const CALCULATORS: [[Option<CollisionCalculator>; 4]; 4] = [
    [
        Some(sphere_sphere as CollisionCalculator),
        Some(sphere_box as CollisionCalculator),
        Some(sphere_capsule as CollisionCalculator),
        Some(sphere_polygon as CollisionCalculator),
    ],
    [
        Some(box_sphere as CollisionCalculator),
        Some(box_box as CollisionCalculator),
        Some(box_capsule as CollisionCalculator),
        None,
    ],
    [
        Some(capsule_sphere as CollisionCalculator),
        Some(capsule_box as CollisionCalculator),
        Some(capsule_capsule as CollisionCalculator),
        Some(capsule_polygon as CollisionCalculator),
    ],
    [
        Some(polygon_sphere as CollisionCalculator),
        None,
        Some(polygon_capsule as CollisionCalculator),
        None,
    ],
];

pub fn calculator_for(kind_a: ShapeKind, kind_b: ShapeKind) -> Option<CollisionCalculator> {
    CALCULATORS[kind_a.index()][kind_b.index()]
}

/// Runs the calculator registered for the pair's kinds.
pub fn calculate(shape_a: &Shape, shape_b: &Shape) -> Result<ShapePairCollisionStatus> {
    let missing = || CollisionError::MissingCalculator(shape_a.kind(), shape_b.kind());
    let calculator = calculator_for(shape_a.kind(), shape_b.kind()).ok_or_else(missing)?;
    calculator(shape_a, shape_b).ok_or_else(missing)
}

fn sphere_sphere(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    let (center_a, radius_a) = a.world_sphere()?;
    let (center_b, radius_b) = b.world_sphere()?;
    let delta = center_b - center_a;
    let distance = delta.length();
    let radii = radius_a + radius_b;
    if distance >= radii {
        return Some(ShapePairCollisionStatus::new(a, b));
    }

    let direction = delta.try_normalize().unwrap_or(DVec3::Y);
    let overlap = radii - distance;
    Some(ShapePairCollisionStatus::colliding(
        a,
        b,
        center_a + direction * (radius_a - overlap * 0.5),
        direction * (distance - radii),
    ))
}

fn sphere_capsule(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    let (center, sphere_radius) = a.world_sphere()?;
    let (spine, capsule_radius) = b.world_capsule()?;
    let closest = spine.closest_point_to(center);
    let delta = center - closest;
    let distance = delta.length();
    let radii = sphere_radius + capsule_radius;
    if distance >= radii {
        return Some(ShapePairCollisionStatus::new(a, b));
    }

    let direction = delta
        .try_normalize()
        .unwrap_or_else(|| any_perpendicular(spine.delta()));
    let overlap = radii - distance;
    Some(ShapePairCollisionStatus::colliding(
        a,
        b,
        closest + direction * (capsule_radius - overlap * 0.5),
        direction * overlap,
    ))
}

fn capsule_capsule(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    let (spine_a, radius_a) = a.world_capsule()?;
    let (spine_b, radius_b) = b.world_capsule()?;
    let connector = spine_a.shortest_connector(&spine_b);
    let distance = connector.length();
    let radii = radius_a + radius_b;
    if distance >= radii {
        return Some(ShapePairCollisionStatus::new(a, b));
    }

    // Crossing spines: separate along the common normal of the two spines.
    let direction = connector.delta().try_normalize().unwrap_or_else(|| {
        spine_a
            .delta()
            .cross(spine_b.delta())
            .try_normalize()
            .unwrap_or_else(|| any_perpendicular(spine_a.delta()))
    });
    let overlap = radii - distance;
    Some(ShapePairCollisionStatus::colliding(
        a,
        b,
        connector.point_a + direction * (radius_a - overlap * 0.5),
        direction * (distance - radii),
    ))
}

fn sphere_box(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    let (center, radius) = a.world_sphere()?;
    let cuboid = b.as_box()?;
    let local_box = cuboid.local_box();
    let local_center = b.world_to_object().transform_point(center);
    let surface = local_box.closest_surface_point_to(local_center);
    let delta = local_center - surface;
    let distance = delta.length();
    let inside = local_box.contains_point(local_center);
    if !inside && distance >= radius {
        return Some(ShapePairCollisionStatus::new(a, b));
    }

    let local_separation = if distance < SPHERE_BOX_AXIS_BORDER {
        face_axis_toward(local_center, cuboid.half_extents) * radius
    } else if inside {
        -delta / distance * (radius + distance)
    } else {
        delta / distance * (radius - distance)
    };

    Some(ShapePairCollisionStatus::colliding(
        a,
        b,
        b.object_to_world().transform_point(surface),
        b.object_to_world().transform_vector(local_separation),
    ))
}

/// Outward face axis of the box face `point` is closest to, relative to the box size.
fn face_axis_toward(point: DVec3, half_extents: DVec3) -> DVec3 {
    let relative = point / half_extents;
    let axis = if relative.x.abs() >= relative.y.abs() && relative.x.abs() >= relative.z.abs() {
        0
    } else if relative.y.abs() >= relative.z.abs() {
        1
    } else {
        2
    };
    let mut normal = DVec3::ZERO;
    normal[axis] = if relative[axis] < 0.0 { -1.0 } else { 1.0 };
    normal
}

fn sphere_polygon(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    let (center, radius) = a.world_sphere()?;
    let world = b.world_polygon()?;
    let closest = world.polygon.closest_point_to(center);
    let delta = center - closest;
    let distance = delta.length();
    if distance >= radius {
        return Some(ShapePairCollisionStatus::new(a, b));
    }

    let direction = delta.try_normalize().unwrap_or(world.plane.unit_normal);
    Some(ShapePairCollisionStatus::colliding(
        a,
        b,
        closest,
        direction * (radius - distance),
    ))
}

fn capsule_polygon(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    let (spine, radius) = a.world_capsule()?;
    let world = b.world_polygon()?;
    let plane = world.plane;

    // Candidate connectors run from the polygon to the spine.
    let mut candidates: Vec<LineSegment> = Vec::new();
    for endpoint in [spine.point_a, spine.point_b] {
        let projected = plane.closest_point_to(endpoint);
        if world.polygon.contains_point(projected) {
            candidates.push(LineSegment::new(projected, endpoint));
        }
    }
    candidates.extend(world.polygon.edges().map(|edge| edge.shortest_connector(&spine)));
    let connector = candidates
        .into_iter()
        .min_by(|x, y| x.length().total_cmp(&y.length()))?;

    let distance = connector.length();
    let pierced = world.polygon.intersect_segment(&spine).is_some();
    if !pierced && distance >= radius {
        return Some(ShapePairCollisionStatus::new(a, b));
    }

    let direction = connector.delta().try_normalize().unwrap_or_else(|| {
        if plane.signed_distance_to(spine.midpoint()) >= 0.0 {
            -plane.unit_normal
        } else {
            plane.unit_normal
        }
    });
    // A pierced spine leaves through the short side; otherwise back off along the connector.
    let separation = if pierced {
        -direction * (radius + distance)
    } else {
        direction * (radius - distance)
    };
    Some(ShapePairCollisionStatus::colliding(
        a,
        b,
        connector.point_a,
        separation,
    ))
}

fn box_capsule(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    let cuboid = a.as_box()?;
    let (spine, radius) = b.world_capsule()?;
    let local_box = cuboid.local_box();
    let local_spine = a.world_to_object().transform_segment(&spine);

    let Some((capsule_delta, local_contact)) = capsule_exit_from_box(&local_box, &local_spine, radius)
    else {
        return Some(ShapePairCollisionStatus::new(a, b));
    };

    let to_world = a.object_to_world();
    Some(ShapePairCollisionStatus::colliding(
        a,
        b,
        to_world.transform_point(local_contact),
        -to_world.transform_vector(capsule_delta),
    ))
}

/// Box-space translation that moves the capsule clear of the box, with a contact point.
fn capsule_exit_from_box(
    local_box: &Aabb,
    spine: &LineSegment,
    radius: f64,
) -> Option<(DVec3, DVec3)> {
    let length = spine.length();
    let pierced = local_box.contains_point(spine.point_a)
        || Ray::from_segment(spine)
            .cast_against_box(local_box)
            .is_some_and(|alpha| alpha <= length);

    if pierced {
        let half = local_box.half_extents();
        let direction = spine.delta().try_normalize();
        let mut axes = vec![DVec3::X, DVec3::Y, DVec3::Z];
        if let Some(direction) = direction {
            axes.extend(
                [DVec3::X, DVec3::Y, DVec3::Z]
                    .iter()
                    .filter_map(|axis| direction.cross(*axis).try_normalize()),
            );
        }

        let mut best: Option<DVec3> = None;
        for axis in axes {
            let box_radius = half.dot(axis.abs());
            let projected_a = spine.point_a.dot(axis);
            let projected_b = spine.point_b.dot(axis);
            let low = projected_a.min(projected_b) - radius;
            let high = projected_a.max(projected_b) + radius;
            let push_positive = box_radius - low;
            let push_negative = high + box_radius;
            if push_positive <= 0.0 || push_negative <= 0.0 {
                return None;
            }
            let delta = if push_positive <= push_negative {
                axis * push_positive
            } else {
                -axis * push_negative
            };
            if best.map_or(true, |current| delta.length() < current.length()) {
                best = Some(delta);
            }
        }
        let contact = local_box.closest_point_to(spine.midpoint());
        return best.map(|delta| (delta, contact));
    }

    // Closest features: an endpoint against the solid box, or the spine against an edge.
    let endpoints = [spine.point_a, spine.point_b]
        .map(|endpoint| (endpoint, local_box.closest_point_to(endpoint)));
    let edges = local_box.edges().map(|edge| {
        let connector = spine.shortest_connector(&edge);
        (connector.point_a, connector.point_b)
    });
    let closest = endpoints
        .into_iter()
        .chain(edges)
        .min_by(|(a0, a1), (b0, b1)| a0.distance(*a1).total_cmp(&b0.distance(*b1)))?;

    let (spine_point, box_point) = closest;
    let distance = spine_point.distance(box_point);
    if distance >= radius {
        return None;
    }
    let direction = (spine_point - box_point)
        .try_normalize()
        .unwrap_or_else(|| face_axis_toward(box_point, local_box.half_extents()));
    Some((direction * (radius - distance), box_point))
}

/// World-space box: placement plus precomputed inverse.
struct PlacedBox<'a> {
    shape: &'a BoxShape,
    object_to_world: Transform,
    world_to_object: Transform,
}

impl<'a> PlacedBox<'a> {
    fn new(shape: &'a BoxShape, object_to_world: Transform) -> Self {
        Self {
            shape,
            object_to_world,
            world_to_object: object_to_world.inverse(),
        }
    }

    fn world_edges(&self) -> [LineSegment; 12] {
        self.shape
            .local_box()
            .edges()
            .map(|edge| self.object_to_world.transform_segment(&edge))
    }

    fn half_axes(&self) -> [DVec3; 3] {
        let matrix = self.object_to_world.matrix;
        let half = self.shape.half_extents;
        [
            matrix.x_axis * half.x,
            matrix.y_axis * half.y,
            matrix.z_axis * half.z,
        ]
    }
}

/// A vertex of the away box inside the home box, with the nearest home surface point.
struct VertexPenetration {
    point: DVec3,
    surface: DVec3,
}

/// Where an edge of the away box enters or leaves the home box while one end is inside.
struct FacePuncture {
    surface: DVec3,
    internal: DVec3,
}

/// Interpenetration features of the away box's corners and edges against the home box.
#[derive(Default)]
struct PenetrationInfo {
    vertices: Vec<VertexPenetration>,
    impalements: Vec<LineSegment>,
    punctures: Vec<FacePuncture>,
}

impl PenetrationInfo {
    fn gather(home: &PlacedBox<'_>, away: &PlacedBox<'_>) -> Self {
        let home_box = home.shape.local_box();
        let to_local = &home.world_to_object;
        let to_world = &home.object_to_world;
        let mut info = Self::default();

        for corner in away.shape.world_corners(&away.object_to_world) {
            let local = to_local.transform_point(corner);
            if !home_box.contains_point(local) {
                continue;
            }
            let surface = home_box.closest_surface_point_to(local);
            if local.distance(surface) > BOX_FEATURE_THRESHOLD {
                info.vertices.push(VertexPenetration {
                    point: corner,
                    surface: to_world.transform_point(surface),
                });
            }
        }

        for edge in away.world_edges() {
            let local = to_local.transform_segment(&edge);
            let length = local.length();
            if length <= EPSILON {
                continue;
            }
            let ray = Ray::from_segment(&local);
            let Some((t_min, t_max)) = ray.box_interval(&home_box) else {
                continue;
            };
            if t_max.min(length) - t_min.max(0.0) <= BOX_FEATURE_THRESHOLD {
                continue;
            }
            match (
                home_box.contains_point(local.point_a),
                home_box.contains_point(local.point_b),
            ) {
                (false, false) => info.impalements.push(edge),
                (true, false) => {
                    info.push_puncture(to_world.transform_point(ray.point_at(t_max)), edge.point_a)
                }
                (false, true) => {
                    info.push_puncture(to_world.transform_point(ray.point_at(t_min)), edge.point_b)
                }
                (true, true) => {}
            }
        }

        info
    }

    fn push_puncture(&mut self, surface: DVec3, internal: DVec3) {
        if surface.distance(internal) > BOX_FEATURE_THRESHOLD {
            self.punctures.push(FacePuncture { surface, internal });
        }
    }

    fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.impalements.is_empty() && self.punctures.is_empty()
    }
}

enum BoxResolution {
    Separated,
    /// Translation for box A and a point on the feature it resolves.
    Step(DVec3, DVec3),
    Unhandled,
}

/// Picks the translation for A from the features of B in A (`in_a`) and of A in B (`in_b`).
fn resolve_box_features(in_a: &PenetrationInfo, in_b: &PenetrationInfo) -> BoxResolution {
    if in_a.is_empty() && in_b.is_empty() {
        return BoxResolution::Separated;
    }

    let vertex_count = in_a.vertices.len() + in_b.vertices.len();
    if vertex_count == 0 && in_a.impalements.len() == 1 && in_b.impalements.len() == 1 {
        let connector = in_a.impalements[0].shortest_connector(&in_b.impalements[0]);
        return BoxResolution::Step(-connector.delta(), connector.midpoint());
    }

    if vertex_count == 1 && in_a.impalements.is_empty() && in_b.impalements.is_empty() {
        if let Some(vertex) = in_a.vertices.first() {
            return BoxResolution::Step(vertex.point - vertex.surface, vertex.point);
        }
        if let Some(vertex) = in_b.vertices.first() {
            return BoxResolution::Step(vertex.surface - vertex.point, vertex.surface);
        }
    }

    let shallowest = in_a
        .punctures
        .iter()
        .map(|puncture| (puncture, false))
        .chain(in_b.punctures.iter().map(|puncture| (puncture, true)))
        .min_by(|(x, _), (y, _)| {
            x.surface
                .distance(x.internal)
                .total_cmp(&y.surface.distance(y.internal))
        });
    match shallowest {
        Some((puncture, false)) => {
            BoxResolution::Step(puncture.internal - puncture.surface, puncture.surface)
        }
        Some((puncture, true)) => {
            BoxResolution::Step(puncture.surface - puncture.internal, puncture.surface)
        }
        None => BoxResolution::Unhandled,
    }
}

/// Minimum translation of A out of B over the 15 candidate separating axes.
fn separating_axis_translation(a: &PlacedBox<'_>, b: &PlacedBox<'_>) -> Option<DVec3> {
    let half_a = a.half_axes();
    let half_b = b.half_axes();
    let faces_a = half_a.map(|axis| axis.normalize_or_zero());
    let faces_b = half_b.map(|axis| axis.normalize_or_zero());

    let mut axes: Vec<DVec3> = faces_a.iter().chain(faces_b.iter()).copied().collect();
    for face_a in &faces_a {
        for face_b in &faces_b {
            if let Some(axis) = face_a.cross(*face_b).try_normalize() {
                axes.push(axis);
            }
        }
    }

    let offset = a.object_to_world.translation - b.object_to_world.translation;
    let mut best: Option<DVec3> = None;
    for axis in axes {
        if axis == DVec3::ZERO {
            continue;
        }
        let radius_a: f64 = half_a.iter().map(|half| half.dot(axis).abs()).sum();
        let radius_b: f64 = half_b.iter().map(|half| half.dot(axis).abs()).sum();
        let distance = offset.dot(axis);
        let overlap = radius_a + radius_b - distance.abs();
        if overlap <= 0.0 {
            return None;
        }
        let sign = if distance < 0.0 { -1.0 } else { 1.0 };
        if best.map_or(true, |current| overlap < current.length()) {
            best = Some(axis * overlap * sign);
        }
    }
    best
}

/// Resolves the pair in a fixed order so that swapping the arguments only flips the result.
fn box_box(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    if box_pair_order(a, b) == Ordering::Greater {
        return resolve_box_box(b, a).map(|status| status.flipped());
    }
    resolve_box_box(a, b)
}

/// Orders by shape ID, then by world position for shapes that share an ID.
fn box_pair_order(a: &Shape, b: &Shape) -> Ordering {
    let position_a = a.object_to_world().translation;
    let position_b = b.object_to_world().translation;
    a.id()
        .cmp(&b.id())
        .then_with(|| position_a.x.total_cmp(&position_b.x))
        .then_with(|| position_a.y.total_cmp(&position_b.y))
        .then_with(|| position_a.z.total_cmp(&position_b.z))
}

/// Moves a copy of box A out of box B one feature at a time, accumulating the translation.
fn resolve_box_box(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    let box_b = PlacedBox::new(b.as_box()?, *b.object_to_world());
    let original_a = PlacedBox::new(a.as_box()?, *a.object_to_world());
    let mut moving_a = PlacedBox::new(original_a.shape, original_a.object_to_world);

    let mut total = DVec3::ZERO;
    let mut contact: Option<DVec3> = None;
    let mut resolved = false;
    for _ in 0..BOX_BOX_MAX_ITERATIONS {
        let in_a = PenetrationInfo::gather(&moving_a, &box_b);
        let in_b = PenetrationInfo::gather(&box_b, &moving_a);
        let step = match resolve_box_features(&in_a, &in_b) {
            BoxResolution::Separated => {
                resolved = true;
                break;
            }
            BoxResolution::Step(step, point) => {
                contact.get_or_insert(point);
                step
            }
            BoxResolution::Unhandled => {
                debug!("box-box features ambiguous for {} and {}, using separating axes", a.id(), b.id());
                let step = separating_axis_translation(&moving_a, &box_b).unwrap_or(DVec3::ZERO);
                contact.get_or_insert(moving_a.object_to_world.translation);
                total += step;
                resolved = true;
                break;
            }
        };
        if step.length() <= BOX_FEATURE_THRESHOLD {
            resolved = true;
            break;
        }
        total += step;
        let mut placement = moving_a.object_to_world;
        placement.translation += step;
        moving_a = PlacedBox::new(original_a.shape, placement);
    }

    if !resolved {
        warn!(
            "box-box resolution between {} and {} did not converge, using separating axes",
            a.id(),
            b.id()
        );
        total = separating_axis_translation(&original_a, &box_b).unwrap_or(DVec3::ZERO);
    }

    if total.length() <= BOX_FEATURE_THRESHOLD {
        return Some(ShapePairCollisionStatus::new(a, b));
    }
    Some(ShapePairCollisionStatus::colliding(
        a,
        b,
        contact.unwrap_or(original_a.object_to_world.translation),
        total,
    ))
}

fn box_sphere(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    sphere_box(b, a).map(|status| status.flipped())
}

fn capsule_sphere(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    sphere_capsule(b, a).map(|status| status.flipped())
}

fn polygon_sphere(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    sphere_polygon(b, a).map(|status| status.flipped())
}

fn capsule_box(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    box_capsule(b, a).map(|status| status.flipped())
}

fn polygon_capsule(a: &Shape, b: &Shape) -> Option<ShapePairCollisionStatus> {
    capsule_polygon(b, a).map(|status| status.flipped())
}
