use collision_system::collision::narrowphase::{calculate, calculator_for};
use collision_system::{
    AddFlags, BoundingBoxTree, CollisionCache, CollisionError, Shape, ShapeKind, Transform, DVec3,
};
use collision_system::geometry::Aabb;
use collision_system::collision::shapes::ShapeIdAllocator;
use std::f64::consts::FRAC_PI_4;
use std::sync::Arc;

const EPS: f64 = 1e-6;

fn assert_vec_near(actual: DVec3, expected: DVec3, context: &str) {
    assert!(
        actual.distance(expected) < EPS,
        "{context}: expected {expected:?}, got {actual:?}"
    );
}

fn square(y: f64, half: f64) -> Shape {
    Shape::polygon(vec![
        DVec3::new(-half, y, -half),
        DVec3::new(-half, y, half),
        DVec3::new(half, y, half),
        DVec3::new(half, y, -half),
    ])
}

fn tree() -> BoundingBoxTree {
    BoundingBoxTree::new(
        Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(100.0)),
        Arc::new(ShapeIdAllocator::default()),
    )
}

#[test]
fn test_overlapping_spheres_separate_along_center_line() {
    let a = Shape::sphere(DVec3::ZERO, 1.0);
    let b = Shape::sphere(DVec3::new(1.5, 0.0, 0.0), 1.0);

    let status = calculate(&a, &b).unwrap();
    assert!(status.in_collision);
    assert!((status.separation_delta.length() - 0.5).abs() < EPS);
    assert_vec_near(status.separation_delta, DVec3::new(-0.5, 0.0, 0.0), "sphere delta");

    let mirrored = calculate(&b, &a).unwrap();
    assert_vec_near(mirrored.separation_delta, DVec3::new(0.5, 0.0, 0.0), "mirrored delta");
}

#[test]
fn test_distant_spheres_do_not_collide() {
    let a = Shape::sphere(DVec3::ZERO, 1.0);
    let b = Shape::sphere(DVec3::new(3.0, 0.0, 0.0), 1.0);
    let status = calculate(&a, &b).unwrap();
    assert!(!status.in_collision);
    assert_eq!(status.separation_delta, DVec3::ZERO);
}

#[test]
fn test_sphere_resting_on_box_is_pushed_up() {
    let sphere = Shape::sphere(DVec3::new(0.0, 1.5, 0.0), 1.0);
    let cuboid = Shape::cuboid(DVec3::ONE);

    let status = calculate(&sphere, &cuboid).unwrap();
    assert!(status.in_collision);
    assert_vec_near(status.separation_delta, DVec3::new(0.0, 0.5, 0.0), "sphere off box");

    let flipped = calculate(&cuboid, &sphere).unwrap();
    assert_vec_near(flipped.separation_delta, DVec3::new(0.0, -0.5, 0.0), "box off sphere");
}

#[test]
fn test_equal_boxes_separate_by_overlap() {
    let a = Shape::cuboid(DVec3::ONE);
    let b = Shape::cuboid(DVec3::ONE).with_transform(Transform::from_translation(DVec3::new(
        1.5, 0.0, 0.0,
    )));

    let status = calculate(&a, &b).unwrap();
    assert!(status.in_collision);
    assert_vec_near(status.separation_delta, DVec3::new(-0.5, 0.0, 0.0), "box delta");
}

#[test]
fn test_crossed_box_edges_separate_along_connector() {
    let a = Shape::cuboid(DVec3::new(1.0, 1.0, 3.0)).with_transform(Transform::from_axis_angle(
        DVec3::Z,
        FRAC_PI_4,
        DVec3::ZERO,
    ));
    let b_position = DVec3::new(0.0, 2.0 * 2f64.sqrt() - 0.2, 0.0);
    let b = Shape::cuboid(DVec3::new(3.0, 1.0, 1.0)).with_transform(Transform::from_axis_angle(
        DVec3::X,
        FRAC_PI_4,
        b_position,
    ));

    let status = calculate(&a, &b).unwrap();
    assert!(status.in_collision, "crossed edges should collide");
    assert_vec_near(status.separation_delta, DVec3::new(0.0, -0.2, 0.0), "edge delta");

    let moved = a.clone().with_transform(Transform::from_axis_angle(
        DVec3::Z,
        FRAC_PI_4,
        status.separation_delta,
    ));
    let after = calculate(&moved, &b).unwrap();
    assert!(!after.in_collision, "applying the delta should separate the boxes");
}

fn rotated_box_pairs() -> Vec<(Shape, Shape)> {
    (0..40)
        .map(|i| {
            let t = i as f64;
            let a = Shape::cuboid(DVec3::new(1.0 + (t * 0.37) % 1.0, 0.6 + (t * 0.21) % 1.2, 1.3))
                .with_transform(Transform::from_axis_angle(
                    DVec3::new(1.0, t % 3.0, 0.5).normalize(),
                    t * 0.41,
                    DVec3::new((t * 0.13) % 0.8, 0.0, 0.0),
                ));
            let b = Shape::cuboid(DVec3::new(0.8, 1.1 + (t * 0.29) % 0.7, 0.9 + (t * 0.17) % 1.0))
                .with_transform(Transform::from_axis_angle(
                    DVec3::new(t % 2.0, 1.0, (t * 0.7) % 1.5).normalize(),
                    t * 0.73 + 0.2,
                    DVec3::new(0.9 - (t * 0.11) % 0.5, 0.7 + (t * 0.19) % 1.1, (t * 0.23) % 0.9 - 0.4),
                ));
            (a, b)
        })
        .collect()
}

#[test]
fn test_box_pairs_are_order_independent() {
    let mut colliding = 0;
    for (a, b) in rotated_box_pairs() {
        let ab = calculate(&a, &b).unwrap();
        let ba = calculate(&b, &a).unwrap();
        assert_eq!(ab.in_collision, ba.in_collision);
        assert_vec_near(ab.separation_delta, -ba.separation_delta, "swapped box pair");
        if ab.in_collision {
            colliding += 1;
        }
    }
    assert!(colliding > 0, "some pairs should overlap");
}

#[test]
fn test_fresh_caches_agree_on_box_pairs() {
    let mut tree = tree();
    let mut ids = Vec::new();
    for (a, b) in rotated_box_pairs() {
        let a = tree.insert(a, AddFlags::empty()).unwrap();
        let b = tree.insert(b, AddFlags::empty()).unwrap();
        ids.push((a, b));
    }

    for (a, b) in ids {
        let (shape_a, shape_b) = (tree.find_shape(a).unwrap(), tree.find_shape(b).unwrap());
        let ab = CollisionCache::new()
            .determine_collision_status_of_shapes(shape_a, shape_b)
            .unwrap();
        let ba = CollisionCache::new()
            .determine_collision_status_of_shapes(shape_b, shape_a)
            .unwrap();
        assert_eq!(ab.in_collision, ba.in_collision);
        assert_vec_near(ab.separation_delta, -ba.separation_delta, "cached box pair");
    }
}

#[test]
fn test_box_pushes_capsule_resting_on_top() {
    let cuboid = Shape::cuboid(DVec3::ONE);
    let capsule = Shape::capsule(DVec3::new(0.0, 1.5, 0.0), DVec3::new(0.0, 3.0, 0.0), 1.0);

    let status = calculate(&cuboid, &capsule).unwrap();
    assert!(status.in_collision);
    assert_vec_near(status.separation_delta, DVec3::new(0.0, -0.5, 0.0), "box delta");

    let mirrored = calculate(&capsule, &cuboid).unwrap();
    assert_vec_near(mirrored.separation_delta, DVec3::new(0.0, 0.5, 0.0), "capsule delta");
}

#[test]
fn test_capsule_above_polygon_backs_off() {
    let floor = square(0.0, 5.0);
    let capsule = Shape::capsule(DVec3::new(0.0, 0.5, 0.0), DVec3::new(0.0, 2.0, 0.0), 1.0);

    let status = calculate(&capsule, &floor).unwrap();
    assert!(status.in_collision);
    assert_vec_near(status.separation_delta, DVec3::new(0.0, 0.5, 0.0), "capsule delta");
}

#[test]
fn test_capsule_piercing_polygon_leaves_through_short_side() {
    let floor = square(0.0, 5.0);
    let capsule = Shape::capsule(DVec3::new(0.0, -0.25, 0.0), DVec3::new(0.0, 2.0, 0.0), 1.0);

    let status = calculate(&capsule, &floor).unwrap();
    assert!(status.in_collision);
    assert_vec_near(status.separation_delta, DVec3::new(0.0, 1.25, 0.0), "pierced delta");
}

#[test]
fn test_sphere_touching_polygon_face() {
    let floor = square(0.0, 5.0);
    let sphere = Shape::sphere(DVec3::new(1.0, 0.75, 1.0), 1.0);

    let status = calculate(&sphere, &floor).unwrap();
    assert!(status.in_collision);
    assert_vec_near(status.separation_delta, DVec3::new(0.0, 0.25, 0.0), "sphere delta");
}

#[test]
fn test_polygon_pairs_have_no_calculator() {
    assert!(calculator_for(ShapeKind::Polygon, ShapeKind::Polygon).is_none());
    assert!(calculator_for(ShapeKind::Polygon, ShapeKind::Box).is_none());
    assert!(calculator_for(ShapeKind::Box, ShapeKind::Polygon).is_none());
    assert!(calculator_for(ShapeKind::Capsule, ShapeKind::Polygon).is_some());

    let err = calculate(&square(0.0, 1.0), &Shape::cuboid(DVec3::ONE)).unwrap_err();
    assert!(matches!(
        err,
        CollisionError::MissingCalculator(ShapeKind::Polygon, ShapeKind::Box)
    ));
}

#[test]
fn test_cache_reuses_and_reorients_results() {
    let mut tree = tree();
    let a = tree
        .insert(Shape::sphere(DVec3::ZERO, 1.0), AddFlags::empty())
        .unwrap();
    let b = tree
        .insert(Shape::sphere(DVec3::new(1.5, 0.0, 0.0), 1.0), AddFlags::empty())
        .unwrap();
    let mut cache = CollisionCache::new();

    let first = cache
        .determine_collision_status_of_shapes(tree.find_shape(a).unwrap(), tree.find_shape(b).unwrap())
        .unwrap();
    assert_eq!(cache.misses(), 1);
    assert_eq!(cache.hits(), 0);

    let reversed = cache
        .determine_collision_status_of_shapes(tree.find_shape(b).unwrap(), tree.find_shape(a).unwrap())
        .unwrap();
    assert_eq!(cache.hits(), 1);
    assert_eq!(reversed.shape_a, b);
    assert_vec_near(reversed.separation_delta, -first.separation_delta, "reoriented delta");
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_cache_recomputes_after_shape_moves() {
    let mut tree = tree();
    let a = tree
        .insert(Shape::sphere(DVec3::ZERO, 1.0), AddFlags::empty())
        .unwrap();
    let b = tree
        .insert(Shape::sphere(DVec3::new(1.5, 0.0, 0.0), 1.0), AddFlags::empty())
        .unwrap();
    let mut cache = CollisionCache::new();

    let before = cache
        .determine_collision_status_of_shapes(tree.find_shape(a).unwrap(), tree.find_shape(b).unwrap())
        .unwrap();
    assert!(before.in_collision);

    tree.set_object_to_world(a, Transform::from_translation(DVec3::new(-5.0, 0.0, 0.0)))
        .unwrap();
    let after = cache
        .determine_collision_status_of_shapes(tree.find_shape(a).unwrap(), tree.find_shape(b).unwrap())
        .unwrap();
    assert!(!after.in_collision);
    assert_eq!(cache.misses(), 2);
    assert_eq!(after.revision_a, tree.find_shape(a).unwrap().revision());

    cache.forget_shape(a);
    assert!(cache.is_empty());
}

#[test]
fn test_tree_collision_skips_pairs_without_calculator() {
    let mut tree = tree();
    let floor = tree.insert(square(0.0, 5.0), AddFlags::empty()).unwrap();
    tree.insert(Shape::cuboid(DVec3::ONE), AddFlags::empty())
        .unwrap();
    let ball = tree
        .insert(Shape::sphere(DVec3::new(3.0, 0.5, 0.0), 1.0), AddFlags::empty())
        .unwrap();

    let mut cache = CollisionCache::new();
    let mut skipped = Vec::new();
    let statuses = tree
        .calculate_collision(floor, 0, &mut cache, |err| skipped.push(err))
        .unwrap();

    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].other_shape(floor), ball);
    assert_eq!(skipped.len(), 1);
    assert!(matches!(skipped[0], CollisionError::MissingCalculator(..)));
}
