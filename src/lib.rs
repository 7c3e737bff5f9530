//! Collision System – asynchronous collision detection for Rust.
//!
//! A single worker thread owns a bounding box tree of convex shapes (spheres, boxes,
//! capsules and polygons) together with a cache of pairwise narrow phase results. Callers
//! talk to it through [`CollisionSystem`], submitting commands that mutate the world and
//! queries whose results are collected later by task ID.

pub mod collision;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod system;
pub mod task;
pub mod thread;
pub mod utils;

pub use glam::{DMat3, DQuat, DVec3};

pub use collision::{
    AddFlags, BoundingBoxTree, CollisionCache, DrawFlags, RayHit, Shape, ShapeGeometry, ShapeId,
    ShapeKind, ShapePairCollisionStatus, TreeRayHit,
};
pub use config::CollisionConfig;
pub use context::{EngineContext, ErrorReport};
pub use error::{CollisionError, Result};
pub use geometry::{Aabb, DebugLine, LineSegment, Plane, Polygon, Ray, Transform};
pub use system::CollisionSystem;
pub use task::{
    AddShapeCommand, BoolResult, CollisionQuery, CollisionQueryResult, Command, DebugRenderQuery,
    DebugRenderResult, ExitThreadCommand, FileAction, FileCommand, ObjectToWorldCommand,
    ObjectToWorldQuery, ObjectToWorldResult, ProfileStatsQuery, Query, QueryResult, RayCastQuery,
    RayCastResult, RemoveAllShapesCommand, RemoveShapeCommand, ResetProfileDataCommand,
    SetDebugRenderColorCommand, SetUserFlagsCommand, ShapeInBoundsQuery, StatsQuery, StatsResult,
    StringResult, TaskId,
};
pub use thread::{CollisionThread, Worker};
