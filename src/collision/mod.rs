//! Collision world: shape model, broad phase tree, narrow phase calculators and the
//! pairwise result cache.

pub mod cache;
pub mod narrowphase;
pub mod shapes;
pub mod tree;

pub use cache::{CollisionCache, ShapePairCollisionStatus};
pub use shapes::{RayHit, Shape, ShapeGeometry, ShapeId, ShapeKind};
pub use tree::{BoundingBoxNode, BoundingBoxTree, NodeId, TreeRayHit, TreeStats};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Options for inserting a shape into the tree.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AddFlags: u32 {
        /// Let the tree cut the shape along node planes. Meant for static geometry only.
        const ALLOW_SPLIT = 0x0000_0001;
    }
}

bitflags! {
    /// What a debug render query draws.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DrawFlags: u32 {
        const SHAPES = 0x0000_0001;
        /// Shape bounding boxes, in the inverse of each shape's debug color.
        const SHAPE_BOXES = 0x0000_0002;
        const AABB_TREE = 0x0000_0004;
    }
}
