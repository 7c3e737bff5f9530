use crate::collision::cache::ShapePairCollisionStatus;
use crate::collision::shapes::ShapeId;
use crate::collision::tree::TreeRayHit;
use crate::geometry::{DebugLine, Transform};
use glam::DVec3;

/// Counters describing the collision world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsResult {
    pub shape_count: usize,
    pub bound_shape_count: usize,
    pub node_count: usize,
    pub tree_depth: usize,
    pub cached_pair_count: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugRenderResult {
    pub lines: Vec<DebugLine>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RayCastResult {
    pub hit: Option<TreeRayHit>,
}

impl RayCastResult {
    /// Hit shape, or [`ShapeId::NULL`] when nothing was hit.
    pub fn shape_id(&self) -> ShapeId {
        self.hit.map_or(ShapeId::NULL, |hit| hit.shape_id)
    }

    pub fn alpha(&self) -> Option<f64> {
        self.hit.map(|hit| hit.hit.alpha)
    }

    pub fn surface_point(&self) -> Option<DVec3> {
        self.hit.map(|hit| hit.hit.point)
    }

    pub fn surface_normal(&self) -> Option<DVec3> {
        self.hit.map(|hit| hit.hit.normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectToWorldResult {
    pub object_to_world: Transform,
}

/// Every shape found colliding with `shape_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionQueryResult {
    pub shape_id: ShapeId,
    pub collisions: Vec<ShapePairCollisionStatus>,
}

impl CollisionQueryResult {
    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty()
    }

    /// The collision needing the largest separation.
    pub fn most_egregious_collision(&self) -> Option<&ShapePairCollisionStatus> {
        self.collisions.iter().max_by(|a, b| {
            a.separation_delta
                .length_squared()
                .total_cmp(&b.separation_delta.length_squared())
        })
    }

    /// Mean of the deltas that move `shape_id` off each partner.
    pub fn average_separation_delta(&self, shape_id: ShapeId) -> DVec3 {
        if self.collisions.is_empty() {
            return DVec3::ZERO;
        }
        self.collisions
            .iter()
            .map(|status| status.separation_delta_for(shape_id))
            .sum::<DVec3>()
            / self.collisions.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolResult {
    pub answer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringResult {
    pub text: String,
}

/// Output of a query, stored by task ID until the caller collects it.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Stats(StatsResult),
    DebugRender(DebugRenderResult),
    RayCast(RayCastResult),
    ObjectToWorld(ObjectToWorldResult),
    Collision(CollisionQueryResult),
    Bool(BoolResult),
    String(StringResult),
}

impl QueryResult {
    pub fn as_stats(&self) -> Option<&StatsResult> {
        match self {
            QueryResult::Stats(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_debug_render(&self) -> Option<&DebugRenderResult> {
        match self {
            QueryResult::DebugRender(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_ray_cast(&self) -> Option<&RayCastResult> {
        match self {
            QueryResult::RayCast(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_object_to_world(&self) -> Option<&ObjectToWorldResult> {
        match self {
            QueryResult::ObjectToWorld(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_collision(&self) -> Option<&CollisionQueryResult> {
        match self {
            QueryResult::Collision(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            QueryResult::Bool(result) => Some(result.answer),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            QueryResult::String(result) => Some(&result.text),
            _ => None,
        }
    }
}
