//! Global configuration constants for the collision system.

use crate::geometry::Aabb;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Half-size of the default cubic world, centered on the origin.
pub const DEFAULT_WORLD_HALF_EXTENT: f64 = 1000.0;

/// Nodes smaller than this volume are never split further, nor are shapes split against them.
pub const MIN_NODE_VOLUME: f64 = 50.0 * 50.0 * 50.0;

/// Slab thickness used when splitting polygons against a node's dividing plane.
pub const POLYGON_SPLIT_THICKNESS: f64 = 1e-6;

pub const POLYGON_CONVEXITY_TOLERANCE: f64 = 1e-4;

/// Distance under which a point counts as lying on a polygon or its edges.
pub const POINT_ON_POLYGON_TOLERANCE: f64 = 1e-5;

/// Penetrations shallower than this are ignored by the box-box classifier.
pub const BOX_FEATURE_THRESHOLD: f64 = 1e-5;

/// Sphere centers closer than this to a box surface push out along the nearest face axis.
pub const SPHERE_BOX_AXIS_BORDER: f64 = 1e-4;

/// Upper bound on feature-resolution passes before box-box falls back to separating axes.
pub const BOX_BOX_MAX_ITERATIONS: usize = 32;

pub const DEFAULT_TASK_BUDGET_MS: f32 = 16.0;

pub const DEFAULT_THREAD_NAME: &str = "collision-worker";

pub const DEFAULT_DEBUG_COLOR: [f64; 3] = [1.0, 0.0, 0.0];

/// Runtime settings for a [`crate::CollisionSystem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub world_extents: Aabb,
    pub min_node_volume: f64,
    pub thread_name: String,
    /// Tasks running longer than this are logged; zero disables the warning.
    pub task_budget_ms: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            world_extents: Aabb::new(
                DVec3::splat(-DEFAULT_WORLD_HALF_EXTENT),
                DVec3::splat(DEFAULT_WORLD_HALF_EXTENT),
            ),
            min_node_volume: MIN_NODE_VOLUME,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            task_budget_ms: DEFAULT_TASK_BUDGET_MS,
        }
    }
}
