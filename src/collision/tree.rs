//! Binary AABB tree used as the broad phase.
//!
//! Nodes live in an arena and are split lazily the first time a shape descends through
//! them. Each shape is bound to the deepest node whose box fully contains its bounding
//! box; shapes straddling a dividing plane stay at the node that owns the plane.

use crate::collision::cache::{CollisionCache, ShapePairCollisionStatus};
use crate::collision::shapes::{RayHit, Shape, ShapeId, ShapeIdAllocator};
use crate::collision::AddFlags;
use crate::config::MIN_NODE_VOLUME;
use crate::error::{CollisionError, Result};
use crate::geometry::{Aabb, DebugLine, Plane, Ray, Transform};
use crate::utils::arena::{Arena, ArenaId};
use crate::utils::logging::ScopedTimer;
use glam::DVec3;
use log::{debug, trace, warn};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

pub type NodeId = ArenaId;

/// One cell of the tree.
#[derive(Debug, Clone)]
pub struct BoundingBoxNode {
    bounding_box: Aabb,
    dividing_plane: Option<Plane>,
    children: Option<[NodeId; 2]>,
    parent: Option<NodeId>,
    shapes: BTreeSet<ShapeId>,
}

impl BoundingBoxNode {
    fn new(bounding_box: Aabb, parent: Option<NodeId>) -> Self {
        Self {
            bounding_box,
            dividing_plane: None,
            children: None,
            parent,
            shapes: BTreeSet::new(),
        }
    }

    pub fn bounding_box(&self) -> &Aabb {
        &self.bounding_box
    }

    pub fn dividing_plane(&self) -> Option<&Plane> {
        self.dividing_plane.as_ref()
    }

    /// Back (min side) child first.
    pub fn children(&self) -> Option<[NodeId; 2]> {
        self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Shapes bound directly to this node.
    pub fn shapes(&self) -> &BTreeSet<ShapeId> {
        &self.shapes
    }
}

/// Closest ray hit found in the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeRayHit {
    pub shape_id: ShapeId,
    pub hit: RayHit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub shape_count: usize,
    pub bound_shape_count: usize,
    pub node_count: usize,
    pub depth: usize,
}

pub struct BoundingBoxTree {
    nodes: Arena<BoundingBoxNode>,
    root: NodeId,
    shapes: HashMap<ShapeId, Shape>,
    shape_ids: Arc<ShapeIdAllocator>,
    min_node_volume: f64,
}

impl BoundingBoxTree {
    pub fn new(world_extents: Aabb, shape_ids: Arc<ShapeIdAllocator>) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.insert(BoundingBoxNode::new(world_extents, None));
        Self {
            nodes,
            root,
            shapes: HashMap::new(),
            shape_ids,
            min_node_volume: MIN_NODE_VOLUME,
        }
    }

    pub fn with_min_node_volume(mut self, min_node_volume: f64) -> Self {
        self.min_node_volume = min_node_volume;
        self
    }

    pub fn world_extents(&self) -> &Aabb {
        &self.node_ref(self.root).bounding_box
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&BoundingBoxNode> {
        self.nodes.get(id)
    }

    fn node_ref(&self, id: NodeId) -> &BoundingBoxNode {
        self.nodes
            .get(id)
            .unwrap_or_else(|| unreachable!("dangling node id {id:?}"))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut BoundingBoxNode {
        self.nodes
            .get_mut(id)
            .unwrap_or_else(|| unreachable!("dangling node id {id:?}"))
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn find_shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> + '_ {
        self.shapes.values()
    }

    /// Shapes in ascending ID order.
    pub fn sorted_shapes(&self) -> Vec<&Shape> {
        let mut shapes: Vec<&Shape> = self.shapes.values().collect();
        shapes.sort_by_key(|shape| shape.id());
        shapes
    }

    /// Node the shape is bound to; `None` for unknown shapes and shapes outside the world.
    pub fn node_of(&self, id: ShapeId) -> Option<NodeId> {
        self.shapes.get(&id).and_then(Shape::node)
    }

    pub fn is_bound(&self, id: ShapeId) -> bool {
        self.node_of(id).is_some()
    }

    /// Takes ownership of the shape and binds it into the tree.
    ///
    /// Shapes without an ID get a fresh one. With [`AddFlags::ALLOW_SPLIT`] the shape may be
    /// cut along node planes; the back piece keeps the returned ID and every other piece
    /// gets a new one. Shapes outside the world extents are kept but left unbound.
    pub fn insert(&mut self, mut shape: Shape, flags: AddFlags) -> Result<ShapeId> {
        let id = if shape.id().is_null() {
            self.shape_ids.allocate()
        } else if self.shapes.contains_key(&shape.id()) {
            return Err(CollisionError::DuplicateShape(shape.id()));
        } else {
            shape.id()
        };
        shape.set_id(id);
        if !shape.is_valid() {
            return Err(CollisionError::InvalidShape(id));
        }

        shape.set_node(None);
        self.shapes.insert(id, shape);
        self.bind(id, self.root, flags);
        debug!("inserted shape {id}");
        Ok(id)
    }

    /// Removes the shape and hands it back.
    pub fn remove(&mut self, id: ShapeId) -> Result<Shape> {
        self.unbind(id);
        let shape = self
            .shapes
            .remove(&id)
            .ok_or(CollisionError::UnknownShape(id))?;
        debug!("removed shape {id}");
        Ok(shape)
    }

    /// Drops every shape and collapses the tree back to its root.
    pub fn clear(&mut self) {
        let world_extents = *self.world_extents();
        self.shapes.clear();
        self.nodes.clear();
        self.root = self.nodes.insert(BoundingBoxNode::new(world_extents, None));
    }

    /// Moves a shape and re-binds it, starting the search from its current node.
    pub fn set_object_to_world(&mut self, id: ShapeId, object_to_world: Transform) -> Result<()> {
        let shape = self
            .shapes
            .get_mut(&id)
            .ok_or(CollisionError::UnknownShape(id))?;
        if !object_to_world.is_valid() {
            return Err(CollisionError::InvalidShape(id));
        }
        shape.set_object_to_world(object_to_world);
        let start = shape.node().unwrap_or(self.root);
        self.unbind(id);
        self.bind(id, start, AddFlags::empty());
        Ok(())
    }

    pub fn set_debug_color(&mut self, id: ShapeId, color: DVec3) -> Result<()> {
        self.shapes
            .get_mut(&id)
            .map(|shape| shape.set_debug_color(color))
            .ok_or(CollisionError::UnknownShape(id))
    }

    pub fn set_user_flags(&mut self, id: ShapeId, user_flags: u64) -> Result<()> {
        self.shapes
            .get_mut(&id)
            .map(|shape| shape.set_user_flags(user_flags))
            .ok_or(CollisionError::UnknownShape(id))
    }

    fn unbind(&mut self, id: ShapeId) {
        let Some(node_id) = self.shapes.get_mut(&id).and_then(|shape| {
            let node = shape.node();
            shape.set_node(None);
            node
        }) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.shapes.remove(&id);
        }
    }

    /// Walks up from `start` until the shape fits, then down as far as it still fits.
    fn bind(&mut self, id: ShapeId, start: NodeId, flags: AddFlags) {
        let Some(shape_box) = self.shapes.get(&id).map(|shape| *shape.bounding_box()) else {
            return;
        };

        let mut node_id = start;
        while !self.node_ref(node_id).bounding_box.contains_box(&shape_box) {
            match self.node_ref(node_id).parent {
                Some(parent) => node_id = parent,
                None => {
                    warn!("shape {id} lies outside the world extents and stays unbound");
                    return;
                }
            }
        }

        loop {
            if self.node_ref(node_id).bounding_box.volume() < self.min_node_volume {
                break;
            }
            let children = self.split_node(node_id);
            let fitting = children
                .into_iter()
                .find(|child| self.node_ref(*child).bounding_box.contains_box(&shape_box));
            match fitting {
                Some(child) => node_id = child,
                None => {
                    if flags.contains(AddFlags::ALLOW_SPLIT) && self.split_shape(id, node_id, flags) {
                        return;
                    }
                    break;
                }
            }
        }

        self.node_mut(node_id).shapes.insert(id);
        if let Some(shape) = self.shapes.get_mut(&id) {
            shape.set_node(Some(node_id));
        }
        trace!("bound shape {id} to node {node_id:?}");
    }

    /// Cuts the shape along the node's dividing plane and binds both pieces from that node.
    fn split_shape(&mut self, id: ShapeId, node_id: NodeId, flags: AddFlags) -> bool {
        let Some(plane) = self.node_ref(node_id).dividing_plane else {
            return false;
        };
        let Some((mut back, mut front)) = self.shapes.get(&id).and_then(|shape| shape.split(&plane))
        else {
            return false;
        };

        back.set_id(id);
        let front_id = self.shape_ids.allocate();
        front.set_id(front_id);
        trace!("split shape {id} into {id} and {front_id}");

        self.shapes.insert(id, back);
        self.shapes.insert(front_id, front);
        self.bind(id, node_id, flags);
        self.bind(front_id, node_id, flags);
        true
    }

    /// Creates the node's children on first use.
    fn split_node(&mut self, node_id: NodeId) -> [NodeId; 2] {
        if let Some(children) = self.node_ref(node_id).children {
            return children;
        }
        let (back, front, plane) = self.node_ref(node_id).bounding_box.split();
        let children = [
            self.nodes.insert(BoundingBoxNode::new(back, Some(node_id))),
            self.nodes.insert(BoundingBoxNode::new(front, Some(node_id))),
        ];
        let node = self.node_mut(node_id);
        node.children = Some(children);
        node.dividing_plane = Some(plane);
        children
    }

    /// Closest hit among shapes matching the mask. A zero mask matches every shape; hits
    /// outside `bounds`, when given, are ignored.
    pub fn ray_cast(
        &self,
        ray: &Ray,
        bounds: Option<&Aabb>,
        user_flags_mask: u64,
    ) -> Option<TreeRayHit> {
        let _timer = ScopedTimer::new("tree ray cast");
        ray.hits_or_starts_in(self.world_extents())?;
        let mut best = None;
        self.ray_cast_node(self.root, ray, bounds, user_flags_mask, &mut best);
        best
    }

    /// Returns whether this subtree improved `best`.
    fn ray_cast_node(
        &self,
        node_id: NodeId,
        ray: &Ray,
        bounds: Option<&Aabb>,
        user_flags_mask: u64,
        best: &mut Option<TreeRayHit>,
    ) -> bool {
        let node = self.node_ref(node_id);
        let mut found = false;

        if let Some(children) = node.children {
            let mut candidates: Vec<(f64, NodeId)> = children
                .iter()
                .filter_map(|child| {
                    ray.hits_or_starts_in(&self.node_ref(*child).bounding_box)
                        .map(|alpha| (alpha, *child))
                })
                .collect();
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
            // Children are disjoint, so a hit in a nearer child beats anything farther away.
            for (_, child) in candidates {
                if self.ray_cast_node(child, ray, bounds, user_flags_mask, best) {
                    found = true;
                    break;
                }
            }
        }

        for shape_id in &node.shapes {
            let Some(shape) = self.shapes.get(shape_id) else {
                continue;
            };
            if !shape.matches_mask(user_flags_mask) {
                continue;
            }
            let Some(hit) = shape.ray_cast(ray) else {
                continue;
            };
            if bounds.is_some_and(|bounds| !bounds.contains_point(hit.point)) {
                continue;
            }
            if best.map_or(true, |current| hit.alpha < current.hit.alpha) {
                *best = Some(TreeRayHit {
                    shape_id: *shape_id,
                    hit,
                });
                found = true;
            }
        }

        found
    }

    /// Collects every shape colliding with `shape_id`, walking the tree from the root.
    ///
    /// Pairs without a calculator are skipped and handed to `on_skipped`.
    pub fn calculate_collision(
        &self,
        shape_id: ShapeId,
        user_flags_mask: u64,
        cache: &mut CollisionCache,
        mut on_skipped: impl FnMut(CollisionError),
    ) -> Result<Vec<ShapePairCollisionStatus>> {
        let _timer = ScopedTimer::new("tree collision gather");
        let shape = self
            .shapes
            .get(&shape_id)
            .ok_or(CollisionError::UnknownShape(shape_id))?;
        let query_box = *shape.bounding_box();

        let mut statuses = Vec::new();
        let mut queue = VecDeque::new();
        if self.world_extents().intersects(&query_box) {
            queue.push_back(self.root);
        }

        while let Some(node_id) = queue.pop_front() {
            let node = self.node_ref(node_id);
            if let Some(children) = node.children {
                queue.extend(
                    children
                        .into_iter()
                        .filter(|child| self.node_ref(*child).bounding_box.intersects(&query_box)),
                );
            }

            for other_id in &node.shapes {
                if *other_id == shape_id {
                    continue;
                }
                let Some(other) = self.shapes.get(other_id) else {
                    continue;
                };
                if !other.matches_mask(user_flags_mask) || !other.bounding_box().intersects(&query_box) {
                    continue;
                }
                match cache.determine_collision_status_of_shapes(shape, other) {
                    Ok(status) if status.in_collision => statuses.push(status),
                    Ok(_) => {}
                    Err(err) => {
                        debug!("collision between {shape_id} and {other_id} skipped");
                        on_skipped(err);
                    }
                }
            }
        }

        Ok(statuses)
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            shape_count: self.shapes.len(),
            bound_shape_count: self.shapes.values().filter(|shape| shape.node().is_some()).count(),
            node_count: self.nodes.len(),
            depth: self.depth_below(self.root),
        }
    }

    fn depth_below(&self, node_id: NodeId) -> usize {
        1 + self
            .node_ref(node_id)
            .children
            .map(|children| {
                children
                    .iter()
                    .map(|child| self.depth_below(*child))
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Emits the box of every node in `color`.
    pub fn debug_render(&self, color: DVec3, lines: &mut Vec<DebugLine>) {
        for (_, node) in self.nodes.iter() {
            node.bounding_box.debug_lines(color, lines);
        }
    }
}
