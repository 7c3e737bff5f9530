use collision_system::collision::shapes::ShapeIdAllocator;
use collision_system::geometry::{Aabb, Ray};
use collision_system::{AddFlags, BoundingBoxTree, CollisionError, Shape, ShapeId, Transform, DVec3};
use std::sync::Arc;

fn world_tree() -> BoundingBoxTree {
    BoundingBoxTree::new(
        Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(1000.0)),
        Arc::new(ShapeIdAllocator::default()),
    )
}

fn assert_bound_inside_ancestors(tree: &BoundingBoxTree, id: ShapeId) {
    let shape = tree.find_shape(id).expect("shape missing");
    let mut node_id = tree.node_of(id).expect("shape should be bound");
    let mut node = tree.node(node_id).expect("node missing");
    assert!(
        node.bounding_box().contains_box(shape.bounding_box()),
        "shape {id} escapes its node"
    );
    assert!(node.shapes().contains(&id));
    while let Some(parent_id) = node.parent() {
        let parent = tree.node(parent_id).expect("parent missing");
        assert!(
            parent.bounding_box().contains_box(node.bounding_box()),
            "node {node_id:?} escapes its parent"
        );
        node_id = parent_id;
        node = parent;
    }
    assert_eq!(node_id, tree.root());
}

#[test]
fn test_every_shape_fits_its_node_and_ancestors() {
    let mut tree = world_tree();
    let mut ids = Vec::new();
    for i in -5..5 {
        for j in -5..5 {
            let center = DVec3::new(i as f64 * 90.0 + 7.0, j as f64 * 60.0 - 3.0, (i * j) as f64);
            let shape = if (i + j) % 2 == 0 {
                Shape::sphere(center, 2.0)
            } else {
                Shape::cuboid(DVec3::new(1.0, 3.0, 2.0))
                    .with_transform(Transform::from_axis_angle(DVec3::Y, 0.3, center))
            };
            ids.push(tree.insert(shape, AddFlags::empty()).unwrap());
        }
    }

    assert_eq!(tree.len(), 100);
    for id in &ids {
        assert_bound_inside_ancestors(&tree, *id);
    }
    let stats = tree.stats();
    assert_eq!(stats.shape_count, 100);
    assert_eq!(stats.bound_shape_count, 100);
    assert!(stats.depth > 1);
}

#[test]
fn test_moved_shape_is_rebound() {
    let mut tree = world_tree();
    let id = tree
        .insert(Shape::sphere(DVec3::ZERO, 1.0), AddFlags::empty())
        .unwrap();
    let far = DVec3::new(-600.0, 400.0, 300.0);

    tree.set_object_to_world(id, Transform::from_translation(far)).unwrap();
    assert_bound_inside_ancestors(&tree, id);
    let moved = tree.find_shape(id).unwrap();
    assert!((moved.bounding_box().center() - far).length() < 1e-9);
}

#[test]
fn test_find_and_remove_shapes() {
    let mut tree = world_tree();
    let a = tree
        .insert(Shape::sphere(DVec3::ZERO, 1.0), AddFlags::empty())
        .unwrap();
    let b = tree
        .insert(Shape::cuboid(DVec3::ONE), AddFlags::empty())
        .unwrap();
    assert_ne!(a, b);
    assert!(!a.is_null());

    let removed = tree.remove(a).unwrap();
    assert_eq!(removed.id(), a);
    assert!(tree.find_shape(a).is_none());
    assert!(tree.find_shape(b).is_some());
    assert!(matches!(tree.remove(a), Err(CollisionError::UnknownShape(id)) if id == a));

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.stats().node_count, 1);
}

#[test]
fn test_shape_outside_world_is_kept_unbound() {
    let mut tree = world_tree();
    let id = tree
        .insert(Shape::sphere(DVec3::new(5000.0, 0.0, 0.0), 1.0), AddFlags::empty())
        .unwrap();

    assert!(tree.find_shape(id).is_some());
    assert!(!tree.is_bound(id));
    assert_eq!(tree.stats().bound_shape_count, 0);
}

#[test]
fn test_invalid_shapes_are_rejected() {
    let mut tree = world_tree();
    let result = tree.insert(Shape::sphere(DVec3::ZERO, -1.0), AddFlags::empty());
    assert!(matches!(result, Err(CollisionError::InvalidShape(_))));
    assert!(tree.is_empty());
}

#[test]
fn test_split_polygon_keeps_area_and_original_id() {
    let mut tree = world_tree();
    let floor = Shape::polygon(vec![
        DVec3::new(-10.0, 5.0, -10.0),
        DVec3::new(-10.0, 5.0, 10.0),
        DVec3::new(10.0, 5.0, 10.0),
        DVec3::new(10.0, 5.0, -10.0),
    ]);
    let id = tree.insert(floor, AddFlags::ALLOW_SPLIT).unwrap();

    assert!(tree.len() > 1, "floor straddling the root plane should be cut");
    assert!(tree.find_shape(id).is_some());
    let total_area: f64 = tree.shapes().map(|shape| shape.calc_size()).sum();
    assert!((total_area - 400.0).abs() < 1e-6, "pieces cover {total_area}");
    for shape in tree.shapes() {
        assert_bound_inside_ancestors(&tree, shape.id());
    }
}

#[test]
fn test_unsplit_polygon_stays_whole() {
    let mut tree = world_tree();
    let floor = Shape::polygon(vec![
        DVec3::new(-10.0, 5.0, -10.0),
        DVec3::new(-10.0, 5.0, 10.0),
        DVec3::new(10.0, 5.0, 10.0),
        DVec3::new(10.0, 5.0, -10.0),
    ]);
    let id = tree.insert(floor, AddFlags::empty()).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.node_of(id), Some(tree.root()));
}

#[test]
fn test_ray_cast_returns_nearest_hit() {
    let mut tree = world_tree();
    let mut ids = Vec::new();
    for i in 0..5 {
        let center = DVec3::new(100.0 * i as f64 - 50.0, 0.0, 0.0);
        ids.push(
            tree.insert(Shape::sphere(center, 5.0), AddFlags::empty())
                .unwrap(),
        );
    }

    let ray = Ray::new(DVec3::new(-500.0, 0.0, 0.0), DVec3::X);
    let hit = tree.ray_cast(&ray, None, 0).expect("ray should hit");
    assert_eq!(hit.shape_id, ids[0]);
    assert!((hit.hit.alpha - 445.0).abs() < 1e-9);
    assert!((hit.hit.normal - DVec3::NEG_X).length() < 1e-9);

    let backwards = Ray::new(DVec3::new(500.0, 0.0, 0.0), DVec3::NEG_X);
    let hit = tree.ray_cast(&backwards, None, 0).expect("ray should hit");
    assert_eq!(hit.shape_id, ids[4]);

    let again = tree.ray_cast(&backwards, None, 0).unwrap();
    assert_eq!(again, hit);
}

#[test]
fn test_ray_cast_honors_mask_and_bounds() {
    let mut tree = world_tree();
    let near = tree
        .insert(
            Shape::sphere(DVec3::new(-50.0, 0.0, 0.0), 5.0).with_user_flags(0b01),
            AddFlags::empty(),
        )
        .unwrap();
    let far = tree
        .insert(
            Shape::sphere(DVec3::new(50.0, 0.0, 0.0), 5.0).with_user_flags(0b10),
            AddFlags::empty(),
        )
        .unwrap();
    let ray = Ray::new(DVec3::new(-500.0, 0.0, 0.0), DVec3::X);

    assert_eq!(tree.ray_cast(&ray, None, 0).unwrap().shape_id, near);
    assert_eq!(tree.ray_cast(&ray, None, 0b10).unwrap().shape_id, far);
    assert!(tree.ray_cast(&ray, None, 0b100).is_none());

    let bounds = Aabb::new(DVec3::new(0.0, -100.0, -100.0), DVec3::splat(100.0));
    assert_eq!(tree.ray_cast(&ray, Some(&bounds), 0).unwrap().shape_id, far);

    tree.set_user_flags(far, 0b01).unwrap();
    assert!(tree.ray_cast(&ray, None, 0b10).is_none());
}

#[test]
fn test_ray_missing_world_hits_nothing() {
    let mut tree = world_tree();
    tree.insert(Shape::sphere(DVec3::ZERO, 5.0), AddFlags::empty())
        .unwrap();
    let ray = Ray::new(DVec3::new(0.0, 5000.0, 0.0), DVec3::Y);
    assert!(tree.ray_cast(&ray, None, 0).is_none());
}
