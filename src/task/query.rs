use super::result::{
    BoolResult, CollisionQueryResult, DebugRenderResult, ObjectToWorldResult, QueryResult,
    RayCastResult, StatsResult, StringResult,
};
use crate::collision::shapes::ShapeId;
use crate::collision::DrawFlags;
use crate::error::{CollisionError, Result};
use crate::geometry::{Aabb, Ray};
use crate::thread::Worker;

/// A task that reads collision world state and leaves a [`QueryResult`] behind.
pub trait Query: Send {
    fn name(&self) -> &'static str;

    fn execute_query(self: Box<Self>, worker: &mut Worker) -> Result<QueryResult>;
}

#[derive(Debug, Default)]
pub struct StatsQuery;

impl Query for StatsQuery {
    fn name(&self) -> &'static str {
        "StatsQuery"
    }

    fn execute_query(self: Box<Self>, worker: &mut Worker) -> Result<QueryResult> {
        let tree = worker.tree().stats();
        let cache = worker.cache();
        Ok(QueryResult::Stats(StatsResult {
            shape_count: tree.shape_count,
            bound_shape_count: tree.bound_shape_count,
            node_count: tree.node_count,
            tree_depth: tree.depth,
            cached_pair_count: cache.len(),
            cache_hits: cache.hits(),
            cache_misses: cache.misses(),
        }))
    }
}

#[derive(Debug)]
pub struct DebugRenderQuery {
    pub draw_flags: DrawFlags,
}

impl DebugRenderQuery {
    pub fn new(draw_flags: DrawFlags) -> Self {
        Self { draw_flags }
    }
}

impl Query for DebugRenderQuery {
    fn name(&self) -> &'static str {
        "DebugRenderQuery"
    }

    fn execute_query(self: Box<Self>, worker: &mut Worker) -> Result<QueryResult> {
        Ok(QueryResult::DebugRender(DebugRenderResult {
            lines: worker.debug_visualize(self.draw_flags),
        }))
    }
}

/// Closest shape hit by a ray, optionally limited to `bounds` and a user flag mask.
#[derive(Debug)]
pub struct RayCastQuery {
    pub ray: Ray,
    pub bounds: Option<Aabb>,
    pub user_flags_mask: u64,
}

impl RayCastQuery {
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            bounds: None,
            user_flags_mask: 0,
        }
    }

    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_user_flags_mask(mut self, user_flags_mask: u64) -> Self {
        self.user_flags_mask = user_flags_mask;
        self
    }
}

impl Query for RayCastQuery {
    fn name(&self) -> &'static str {
        "RayCastQuery"
    }

    fn execute_query(self: Box<Self>, worker: &mut Worker) -> Result<QueryResult> {
        let hit = worker
            .tree()
            .ray_cast(&self.ray, self.bounds.as_ref(), self.user_flags_mask);
        Ok(QueryResult::RayCast(RayCastResult { hit }))
    }
}

#[derive(Debug)]
pub struct ObjectToWorldQuery {
    pub shape_id: ShapeId,
}

impl ObjectToWorldQuery {
    pub fn new(shape_id: ShapeId) -> Self {
        Self { shape_id }
    }
}

impl Query for ObjectToWorldQuery {
    fn name(&self) -> &'static str {
        "ObjectToWorldQuery"
    }

    fn execute_query(self: Box<Self>, worker: &mut Worker) -> Result<QueryResult> {
        let shape = worker
            .find_shape(self.shape_id)
            .ok_or(CollisionError::UnknownShape(self.shape_id))?;
        Ok(QueryResult::ObjectToWorld(ObjectToWorldResult {
            object_to_world: *shape.object_to_world(),
        }))
    }
}

/// Every shape colliding with `shape_id` whose user flags match the mask.
#[derive(Debug)]
pub struct CollisionQuery {
    pub shape_id: ShapeId,
    pub user_flags_mask: u64,
}

impl CollisionQuery {
    pub fn new(shape_id: ShapeId) -> Self {
        Self {
            shape_id,
            user_flags_mask: 0,
        }
    }

    pub fn with_user_flags_mask(mut self, user_flags_mask: u64) -> Self {
        self.user_flags_mask = user_flags_mask;
        self
    }
}

impl Query for CollisionQuery {
    fn name(&self) -> &'static str {
        "CollisionQuery"
    }

    fn execute_query(self: Box<Self>, worker: &mut Worker) -> Result<QueryResult> {
        let collisions = worker.calculate_collision(self.shape_id, self.user_flags_mask)?;
        Ok(QueryResult::Collision(CollisionQueryResult {
            shape_id: self.shape_id,
            collisions,
        }))
    }
}

/// Whether the shape is bound inside the world extents.
#[derive(Debug)]
pub struct ShapeInBoundsQuery {
    pub shape_id: ShapeId,
}

impl ShapeInBoundsQuery {
    pub fn new(shape_id: ShapeId) -> Self {
        Self { shape_id }
    }
}

impl Query for ShapeInBoundsQuery {
    fn name(&self) -> &'static str {
        "ShapeInBoundsQuery"
    }

    /// Unknown shapes are answered `false`.
    fn execute_query(self: Box<Self>, worker: &mut Worker) -> Result<QueryResult> {
        Ok(QueryResult::Bool(BoolResult {
            answer: worker.tree().is_bound(self.shape_id),
        }))
    }
}

#[derive(Debug, Default)]
pub struct ProfileStatsQuery;

impl Query for ProfileStatsQuery {
    fn name(&self) -> &'static str {
        "ProfileStatsQuery"
    }

    fn execute_query(self: Box<Self>, worker: &mut Worker) -> Result<QueryResult> {
        Ok(QueryResult::String(StringResult {
            text: worker.profile().report(),
        }))
    }
}
