use crate::collision::narrowphase;
use crate::collision::shapes::{Shape, ShapeId};
use crate::error::Result;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of testing one shape against another.
///
/// `separation_delta` moves `shape_a` off `shape_b` by the shortest distance; moving
/// `shape_b` by its negation works as well. The revision numbers record the state of both
/// shapes the result was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapePairCollisionStatus {
    pub shape_a: ShapeId,
    pub shape_b: ShapeId,
    pub revision_a: u64,
    pub revision_b: u64,
    pub in_collision: bool,
    pub collision_center: DVec3,
    pub separation_delta: DVec3,
}

impl ShapePairCollisionStatus {
    /// A "not colliding" status for the pair's current revisions.
    pub fn new(shape_a: &Shape, shape_b: &Shape) -> Self {
        Self {
            shape_a: shape_a.id(),
            shape_b: shape_b.id(),
            revision_a: shape_a.revision(),
            revision_b: shape_b.revision(),
            in_collision: false,
            collision_center: DVec3::ZERO,
            separation_delta: DVec3::ZERO,
        }
    }

    pub fn colliding(
        shape_a: &Shape,
        shape_b: &Shape,
        collision_center: DVec3,
        separation_delta: DVec3,
    ) -> Self {
        Self {
            in_collision: true,
            collision_center,
            separation_delta,
            ..Self::new(shape_a, shape_b)
        }
    }

    /// Still describes `shape_a` against `shape_b` as they are now.
    pub fn is_valid_for(&self, shape_a: &Shape, shape_b: &Shape) -> bool {
        self.shape_a == shape_a.id()
            && self.shape_b == shape_b.id()
            && self.revision_a == shape_a.revision()
            && self.revision_b == shape_b.revision()
    }

    /// The same result seen from the other shape.
    pub fn flipped(&self) -> Self {
        Self {
            shape_a: self.shape_b,
            shape_b: self.shape_a,
            revision_a: self.revision_b,
            revision_b: self.revision_a,
            in_collision: self.in_collision,
            collision_center: self.collision_center,
            separation_delta: -self.separation_delta,
        }
    }

    /// The partner of `shape_id` in this pair, or [`ShapeId::NULL`] if it is not part of it.
    pub fn other_shape(&self, shape_id: ShapeId) -> ShapeId {
        if shape_id == self.shape_a {
            self.shape_b
        } else if shape_id == self.shape_b {
            self.shape_a
        } else {
            ShapeId::NULL
        }
    }

    /// Separation delta that moves `shape_id` off its partner.
    pub fn separation_delta_for(&self, shape_id: ShapeId) -> DVec3 {
        if shape_id == self.shape_a {
            self.separation_delta
        } else if shape_id == self.shape_b {
            -self.separation_delta
        } else {
            DVec3::ZERO
        }
    }
}

/// Memoized pairwise results keyed by the unordered pair of shape IDs.
#[derive(Debug, Default)]
pub struct CollisionCache {
    entries: HashMap<(ShapeId, ShapeId), ShapePairCollisionStatus>,
    hits: u64,
    misses: u64,
}

impl CollisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: ShapeId, b: ShapeId) -> (ShapeId, ShapeId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Returns the cached status of the pair while both revisions still match, otherwise
    /// recomputes it with the pair's calculator and caches the fresh result.
    pub fn determine_collision_status_of_shapes(
        &mut self,
        shape_a: &Shape,
        shape_b: &Shape,
    ) -> Result<ShapePairCollisionStatus> {
        let key = Self::key(shape_a.id(), shape_b.id());
        if let Some(entry) = self.entries.get(&key) {
            let oriented = if entry.shape_a == shape_a.id() {
                *entry
            } else {
                entry.flipped()
            };
            if oriented.is_valid_for(shape_a, shape_b) {
                self.hits += 1;
                return Ok(oriented);
            }
        }

        self.misses += 1;
        let status = narrowphase::calculate(shape_a, shape_b)?;
        self.entries.insert(key, status);
        Ok(status)
    }

    /// Drops every entry involving the shape.
    pub fn forget_shape(&mut self, shape_id: ShapeId) {
        self.entries
            .retain(|(a, b), _| *a != shape_id && *b != shape_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
