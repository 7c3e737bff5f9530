use collision_system::geometry::{Aabb, Ray};
use collision_system::{
    AddFlags, CollisionConfig, CollisionError, CollisionQuery, CollisionSystem, DebugRenderQuery,
    DrawFlags, ObjectToWorldCommand, ObjectToWorldQuery, ProfileStatsQuery, RayCastQuery,
    RemoveShapeCommand, ResetProfileDataCommand, SetUserFlagsCommand, Shape, ShapeInBoundsQuery,
    ShapeId, ShapeKind, StatsQuery, Transform, DVec3,
};
use std::sync::Arc;
use std::thread;

fn running_system() -> CollisionSystem {
    let mut system = CollisionSystem::new();
    system
        .initialize(Some(Aabb::from_center_half_extents(
            DVec3::ZERO,
            DVec3::splat(500.0),
        )))
        .unwrap();
    system
}

fn stats(system: &CollisionSystem) -> collision_system::StatsResult {
    let query = system.make_query(StatsQuery).unwrap();
    system.flush_all_tasks();
    *system
        .obtain_query_result(query)
        .expect("stats result missing after flush")
        .as_stats()
        .expect("stats query should produce stats")
}

#[test]
fn test_flush_waits_for_every_queued_task() {
    let system = running_system();
    for i in 0..200 {
        let center = DVec3::new((i % 20) as f64 * 10.0 - 100.0, (i / 20) as f64 * 10.0, 0.0);
        system
            .add_shape(Shape::sphere(center, 1.0), AddFlags::empty())
            .unwrap();
    }

    let stats = stats(&system);
    assert_eq!(stats.shape_count, 200);
    assert_eq!(stats.bound_shape_count, 200);
}

#[test]
fn test_query_results_are_taken_once() {
    let system = running_system();
    let query = system.make_query(StatsQuery).unwrap();
    system.flush_all_tasks();

    assert!(system.obtain_query_result(query).is_some());
    assert!(system.obtain_query_result(query).is_none());
}

#[test]
fn test_task_ids_increase() {
    let system = running_system();
    let first = system.make_query(StatsQuery).unwrap();
    let second = system.issue_command(ResetProfileDataCommand).unwrap();
    assert!(second > first);
}

#[test]
fn test_lifecycle_errors() {
    let mut system = CollisionSystem::new();
    assert!(!system.is_running());
    assert!(matches!(
        system.make_query(StatsQuery),
        Err(CollisionError::NotRunning)
    ));
    assert!(matches!(
        system.add_shape(Shape::cuboid(DVec3::ONE), AddFlags::empty()),
        Err(CollisionError::NotRunning)
    ));

    system.initialize(None).unwrap();
    assert!(matches!(
        system.initialize(None),
        Err(CollisionError::AlreadyRunning)
    ));

    system.shutdown().unwrap();
    assert!(!system.is_running());
    system.shutdown().unwrap();
}

#[test]
fn test_shutdown_drops_shapes() {
    let mut system = running_system();
    system
        .add_shape(Shape::cuboid(DVec3::ONE), AddFlags::empty())
        .unwrap();
    system.flush_all_tasks();
    system.shutdown().unwrap();

    system.initialize(None).unwrap();
    assert_eq!(stats(&system).shape_count, 0);
}

#[test]
fn test_commands_move_and_remove_shapes() {
    let system = running_system();
    let id = system
        .add_shape(Shape::cuboid(DVec3::ONE), AddFlags::empty())
        .unwrap();
    let target = Transform::from_translation(DVec3::new(20.0, -5.0, 3.0));
    system
        .issue_command(ObjectToWorldCommand::new(id, target))
        .unwrap();

    let query = system.make_query(ObjectToWorldQuery::new(id)).unwrap();
    system.flush_all_tasks();
    let result = system.obtain_query_result(query).unwrap();
    assert_eq!(
        result.as_object_to_world().map(|r| r.object_to_world),
        Some(target)
    );

    system.remove_shape(id).unwrap();
    assert_eq!(stats(&system).shape_count, 0);
}

#[test]
fn test_failed_tasks_are_reported_and_do_not_stop_the_worker() {
    let system = running_system();
    let query = system
        .make_query(ObjectToWorldQuery::new(collision_system::ShapeId::new(9999)))
        .unwrap();
    system
        .issue_command(RemoveShapeCommand::new(collision_system::ShapeId::new(9998)))
        .unwrap();
    system
        .add_shape(Shape::cuboid(DVec3::ONE), AddFlags::empty())
        .unwrap();

    assert_eq!(stats(&system).shape_count, 1);
    assert!(system.obtain_query_result(query).is_none());
    let errors = system.take_errors();
    assert_eq!(errors.len(), 2, "unexpected errors: {errors:?}");
    assert!(errors.iter().all(|message| message.contains("no shape")));
    assert!(system.take_errors().is_empty());
}

#[test]
fn test_collision_query_reports_partners() {
    let system = running_system();
    let a = system
        .add_shape(Shape::cuboid(DVec3::ONE), AddFlags::empty())
        .unwrap();
    let b = system
        .add_shape(
            Shape::cuboid(DVec3::ONE).with_transform(Transform::from_translation(DVec3::new(
                1.5, 0.0, 0.0,
            ))),
            AddFlags::empty(),
        )
        .unwrap();
    system
        .add_shape(
            Shape::sphere(DVec3::new(50.0, 0.0, 0.0), 1.0),
            AddFlags::empty(),
        )
        .unwrap();

    let query = system.make_query(CollisionQuery::new(a)).unwrap();
    system.flush_all_tasks();
    let result = system.obtain_query_result(query).unwrap();
    let collisions = result.as_collision().expect("collision result");

    assert_eq!(collisions.collisions.len(), 1);
    let worst = collisions.most_egregious_collision().unwrap();
    assert_eq!(worst.other_shape(a), b);
    let delta = collisions.average_separation_delta(a);
    assert!((delta - DVec3::new(-0.5, 0.0, 0.0)).length() < 1e-6, "delta {delta:?}");
}

#[test]
fn test_collision_query_honors_user_flags_mask() {
    let system = running_system();
    let a = system
        .add_shape(Shape::sphere(DVec3::ZERO, 1.0), AddFlags::empty())
        .unwrap();
    let b = system
        .add_shape(
            Shape::sphere(DVec3::new(1.0, 0.0, 0.0), 1.0).with_user_flags(0b1),
            AddFlags::empty(),
        )
        .unwrap();

    let masked = system
        .make_query(CollisionQuery::new(a).with_user_flags_mask(0b10))
        .unwrap();
    system
        .issue_command(SetUserFlagsCommand::new(b, 0b11))
        .unwrap();
    let unmasked = system
        .make_query(CollisionQuery::new(a).with_user_flags_mask(0b10))
        .unwrap();
    system.flush_all_tasks();

    let masked = system.obtain_query_result(masked).unwrap();
    assert!(masked.as_collision().unwrap().is_empty());
    let unmasked = system.obtain_query_result(unmasked).unwrap();
    assert_eq!(unmasked.as_collision().unwrap().collisions.len(), 1);
}

#[test]
fn test_ray_cast_query_is_deterministic() {
    let system = running_system();
    let target = system
        .add_shape(
            Shape::cuboid(DVec3::ONE).with_transform(Transform::from_translation(DVec3::new(
                0.0, 0.0, 0.0,
            ))),
            AddFlags::empty(),
        )
        .unwrap();
    system
        .add_shape(Shape::sphere(DVec3::new(30.0, 0.0, 0.0), 2.0), AddFlags::empty())
        .unwrap();

    let ray = Ray::new(DVec3::new(-10.0, 0.0, 0.0), DVec3::X);
    let first = system.make_query(RayCastQuery::new(ray)).unwrap();
    let second = system.make_query(RayCastQuery::new(ray)).unwrap();
    system.flush_all_tasks();

    let first = system.obtain_query_result(first).unwrap();
    let second = system.obtain_query_result(second).unwrap();
    assert_eq!(first, second);
    let hit = first.as_ray_cast().unwrap();
    assert_eq!(hit.shape_id(), target);
    assert!((hit.alpha().unwrap() - 9.0).abs() < 1e-9);
    assert!((hit.surface_normal().unwrap() - DVec3::NEG_X).length() < 1e-9);
}

#[test]
fn test_shape_in_bounds_query() {
    let system = running_system();
    let inside = system
        .add_shape(Shape::sphere(DVec3::ZERO, 1.0), AddFlags::empty())
        .unwrap();
    let outside = system
        .add_shape(Shape::sphere(DVec3::new(900.0, 0.0, 0.0), 1.0), AddFlags::empty())
        .unwrap();

    let inside_query = system.make_query(ShapeInBoundsQuery::new(inside)).unwrap();
    let outside_query = system.make_query(ShapeInBoundsQuery::new(outside)).unwrap();
    let unknown_query = system
        .make_query(ShapeInBoundsQuery::new(ShapeId::new(9_999)))
        .unwrap();
    system.flush_all_tasks();

    assert_eq!(
        system.obtain_query_result(unknown_query).and_then(|r| r.as_bool()),
        Some(false),
        "unknown shapes should be answered rather than failed"
    );
    assert!(system.take_errors().is_empty());

    assert_eq!(
        system.obtain_query_result(inside_query).and_then(|r| r.as_bool()),
        Some(true)
    );
    assert_eq!(
        system.obtain_query_result(outside_query).and_then(|r| r.as_bool()),
        Some(false)
    );
}

#[test]
fn test_debug_render_layers() {
    let system = running_system();
    system
        .add_shape(Shape::cuboid(DVec3::ONE), AddFlags::empty())
        .unwrap();

    let shapes = system
        .make_query(DebugRenderQuery::new(DrawFlags::SHAPES))
        .unwrap();
    let boxes = system
        .make_query(DebugRenderQuery::new(DrawFlags::SHAPE_BOXES))
        .unwrap();
    let tree = system
        .make_query(DebugRenderQuery::new(DrawFlags::AABB_TREE))
        .unwrap();
    system.flush_all_tasks();

    let shape_lines = system.obtain_query_result(shapes).unwrap();
    assert_eq!(shape_lines.as_debug_render().unwrap().lines.len(), 12);

    let box_lines = system.obtain_query_result(boxes).unwrap();
    let box_lines = &box_lines.as_debug_render().unwrap().lines;
    assert_eq!(box_lines.len(), 12);
    assert!(box_lines
        .iter()
        .all(|line| line.color == DVec3::new(0.0, 1.0, 1.0)));

    let tree_lines = system.obtain_query_result(tree).unwrap();
    let tree_lines = &tree_lines.as_debug_render().unwrap().lines;
    assert!(!tree_lines.is_empty());
    assert_eq!(tree_lines.len() % 12, 0);
    assert!(tree_lines.iter().all(|line| line.color == DVec3::ONE));
}

#[test]
fn test_profile_stats_track_tasks_and_reset() {
    let system = running_system();
    system.make_query(StatsQuery).unwrap();
    system.make_query(StatsQuery).unwrap();
    let report = system.make_query(ProfileStatsQuery).unwrap();
    system.flush_all_tasks();

    let text = system.obtain_query_result(report).unwrap();
    let text = text.as_string().unwrap();
    assert!(text.starts_with("Num. profile blocks: 1"), "{text}");
    assert!(text.contains("Name: StatsQuery"));
    assert!(text.contains("Hit Count: 2"));

    system.issue_command(ResetProfileDataCommand).unwrap();
    let report = system.make_query(ProfileStatsQuery).unwrap();
    system.flush_all_tasks();
    let text = system.obtain_query_result(report).unwrap();
    let text = text.as_string().unwrap();
    assert!(text.starts_with("Num. profile blocks: 1"), "{text}");
    assert!(text.contains("Name: ResetProfileDataCommand"));
    assert!(!text.contains("StatsQuery"));
}

#[test]
fn test_dump_and_restore_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shapes.bin");
    let system = running_system();

    let transform = Transform::from_axis_angle(DVec3::Y, 0.4, DVec3::new(5.0, 6.0, 7.0));
    let originals = [
        Shape::sphere(DVec3::ZERO, 2.0),
        Shape::cuboid(DVec3::new(1.0, 2.0, 3.0)),
        Shape::capsule(DVec3::ZERO, DVec3::Y, 0.5),
        Shape::create(ShapeKind::Polygon),
    ];
    let mut old_ids = Vec::new();
    for shape in originals {
        old_ids.push(
            system
                .add_shape(shape.with_transform(transform), AddFlags::empty())
                .unwrap(),
        );
    }

    assert_eq!(system.dump_to_file(&path).unwrap(), 4);
    system.clear().unwrap();
    assert_eq!(stats(&system).shape_count, 0);

    assert_eq!(system.restore_from_file(&path).unwrap(), 4);
    assert_eq!(stats(&system).shape_count, 4);

    let lookup = system
        .make_query(ObjectToWorldQuery::new(old_ids[0]))
        .unwrap();
    let ray = Ray::new(DVec3::new(5.0, 100.0, 7.0), DVec3::NEG_Y);
    let ray_query = system.make_query(RayCastQuery::new(ray)).unwrap();
    system.flush_all_tasks();

    assert!(
        system.obtain_query_result(lookup).is_none(),
        "restored shapes get fresh IDs"
    );
    let hit = system.obtain_query_result(ray_query).unwrap();
    let hit_id = hit.as_ray_cast().unwrap().shape_id();
    assert!(!hit_id.is_null());
    assert!(!old_ids.contains(&hit_id));

    let restored = system.make_query(ObjectToWorldQuery::new(hit_id)).unwrap();
    system.flush_all_tasks();
    let restored = system.obtain_query_result(restored).unwrap();
    assert_eq!(restored.as_object_to_world().unwrap().object_to_world, transform);
    system.take_errors();
}

#[test]
fn test_dump_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shapes.bin");
    std::fs::write(&path, b"keep me").unwrap();
    let system = running_system();

    let err = system.dump_to_file(&path).unwrap_err();
    assert!(matches!(err, CollisionError::FileExists(_)), "got {err:?}");
    assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    assert_eq!(system.take_errors().len(), 1);
}

#[test]
fn test_restore_requires_existing_well_formed_file() {
    let dir = tempfile::tempdir().unwrap();
    let system = running_system();
    system
        .add_shape(Shape::cuboid(DVec3::ONE), AddFlags::empty())
        .unwrap();

    let missing = system.restore_from_file(dir.path().join("missing.bin"));
    assert!(matches!(missing, Err(CollisionError::FileNotFound(_))));

    let truncated = dir.path().join("truncated.bin");
    std::fs::write(&truncated, [2u8, 0, 0, 0, 1, 0]).unwrap();
    let malformed = system.restore_from_file(&truncated);
    assert!(matches!(malformed, Err(CollisionError::MalformedDump(_))));

    assert_eq!(stats(&system).shape_count, 1);
}

#[test]
fn test_submissions_from_many_threads() {
    let system = Arc::new(running_system());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let system = Arc::clone(&system);
            thread::spawn(move || {
                for i in 0..25 {
                    let center = DVec3::new(t as f64 * 50.0, i as f64 * 5.0, 0.0);
                    system
                        .add_shape(Shape::sphere(center, 1.0), AddFlags::empty())
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stats(&system).shape_count, 100);
}

#[test]
fn test_config_round_trips_through_defaults() {
    let config = CollisionConfig {
        thread_name: "collision-test".to_owned(),
        ..CollisionConfig::default()
    };
    let mut system = CollisionSystem::with_config(config);
    system.initialize(None).unwrap();
    assert_eq!(system.config().thread_name, "collision-test");
    assert_eq!(stats(&system).shape_count, 0);
}
