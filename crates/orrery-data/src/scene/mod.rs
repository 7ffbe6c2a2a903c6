// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The scene: an arena of entities forming a forest.
//!
//! Nodes live in a `Vec` of generational slots and refer to each other by
//! [`EntityId`], never by pointer. A despawned slot is recycled with a bumped
//! generation, so handles to the old entity stop resolving.
//!
//! Every structural or authored-data mutation records a [`SceneChange`];
//! the engine drains them once per tick and hands them to its change
//! arbiter.

use std::sync::{Arc, RwLock};

use orrery_core::change::{ChangeKind, SceneChange};
use orrery_core::ecs::EntityId;
use orrery_core::math::{Aabb, Mat4};

use crate::components::{BoundingVolume, GlobalTransform, Transform};

mod description;
pub use description::{NodeDescription, SceneDescription};

/// A scene shared between the engine, its aspects and their jobs.
pub type SceneHandle = Arc<RwLock<Scene>>;

/// Errors raised by scene mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    /// The id does not name a live entity (despawned or never spawned).
    #[error("entity {0} is not alive")]
    StaleEntity(EntityId),
    /// Reparenting would make an entity its own ancestor.
    #[error("making {child} a child of {parent} would create a cycle")]
    WouldCreateCycle {
        /// The entity being moved.
        child: EntityId,
        /// The requested new parent.
        parent: EntityId,
    },
    /// A scene description could not be parsed.
    #[error("invalid scene description: {0}")]
    Description(String),
}

/// A single entity of the scene.
#[derive(Debug, Clone)]
pub struct Node {
    /// Optional display name.
    pub name: Option<String>,
    /// Local transform relative to the parent.
    pub transform: Transform,
    /// World transform computed by the transform update job.
    pub global: GlobalTransform,
    /// Local, world and expanded bounding volumes.
    pub bounds: BoundingVolume,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
}

impl Node {
    fn new(transform: Transform, parent: Option<EntityId>) -> Self {
        Self {
            name: None,
            transform,
            global: GlobalTransform::IDENTITY,
            bounds: BoundingVolume::default(),
            parent,
            children: Vec::new(),
        }
    }

    /// The parent entity, `None` for roots.
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// The direct children, in insertion order.
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The entity tree.
#[derive(Debug, Default)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<EntityId>,
    live: usize,
    frame: u64,
    changes: Vec<SceneChange>,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the scene into a shareable handle.
    pub fn into_handle(self) -> SceneHandle {
        Arc::new(RwLock::new(self))
    }

    /// Sets the frame number stamped on subsequently recorded changes.
    pub fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    /// The frame number currently stamped on changes.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live
    }

    /// `true` if the scene holds no entity.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Whether `id` names a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.node(id).is_some()
    }

    /// Spawns a root entity.
    pub fn spawn(&mut self, transform: Transform) -> EntityId {
        let id = self.allocate(Node::new(transform, None));
        self.roots.push(id);
        self.record(ChangeKind::NodeCreated, id, "node");
        id
    }

    /// Spawns an entity under `parent`.
    pub fn spawn_child(&mut self, parent: EntityId, transform: Transform) -> Result<EntityId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::StaleEntity(parent));
        }
        let id = self.allocate(Node::new(transform, Some(parent)));
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        self.record(ChangeKind::NodeCreated, id, "node");
        Ok(id)
    }

    /// Despawns `id` and its whole subtree. Returns the number of removed entities.
    pub fn despawn(&mut self, id: EntityId) -> Result<usize, SceneError> {
        let parent = self.node(id).ok_or(SceneError::StaleEntity(id))?.parent;
        self.detach(id, parent);

        let subtree: Vec<EntityId> = self.depth_first(id).collect();
        for &dead in &subtree {
            let slot = &mut self.slots[dead.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(dead.index);
            self.live -= 1;
            self.record(ChangeKind::NodeDeleted, dead, "node");
        }
        log::trace!("Scene: despawned {} entities under {}", subtree.len(), id);
        Ok(subtree.len())
    }

    /// Moves `id` under `new_parent`, or makes it a root when `None`.
    pub fn reparent(&mut self, id: EntityId, new_parent: Option<EntityId>) -> Result<(), SceneError> {
        let old_parent = self.node(id).ok_or(SceneError::StaleEntity(id))?.parent;
        if let Some(parent) = new_parent {
            if !self.contains(parent) {
                return Err(SceneError::StaleEntity(parent));
            }
            if self.ancestors_and_self(parent).any(|a| a == id) {
                return Err(SceneError::WouldCreateCycle { child: id, parent });
            }
        }
        if old_parent == new_parent {
            return Ok(());
        }

        self.detach(id, old_parent);
        match new_parent {
            Some(parent) => {
                if let Some(p) = self.node_mut(parent) {
                    p.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = new_parent;
        }
        self.record(ChangeKind::NodeUpdated, id, "parent");
        Ok(())
    }

    /// Returns the node for `id`.
    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Returns the node for `id` mutably.
    ///
    /// Writes through this accessor are not recorded as scene changes; it is
    /// meant for jobs writing derived data (world transforms, bounds).
    pub fn node_mut(&mut self, id: EntityId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// The local transform of `id`.
    pub fn transform(&self, id: EntityId) -> Option<&Transform> {
        self.node(id).map(|n| &n.transform)
    }

    /// Replaces the local transform of `id`.
    pub fn set_transform(&mut self, id: EntityId, transform: Transform) -> Result<(), SceneError> {
        let node = self.node_mut(id).ok_or(SceneError::StaleEntity(id))?;
        node.transform = transform;
        self.record(ChangeKind::NodeUpdated, id, "transform");
        Ok(())
    }

    /// Enables or disables the transform of `id`.
    pub fn set_transform_enabled(&mut self, id: EntityId, enabled: bool) -> Result<(), SceneError> {
        let node = self.node_mut(id).ok_or(SceneError::StaleEntity(id))?;
        if node.transform.enabled == enabled {
            return Ok(());
        }
        node.transform.enabled = enabled;
        let kind = if enabled {
            ChangeKind::ComponentAdded
        } else {
            ChangeKind::ComponentRemoved
        };
        self.record(kind, id, "transform");
        Ok(())
    }

    /// Sets the local bounding box of `id`.
    pub fn set_local_bounds(&mut self, id: EntityId, local: Aabb) -> Result<(), SceneError> {
        let node = self.node_mut(id).ok_or(SceneError::StaleEntity(id))?;
        node.bounds.local = local;
        self.record(ChangeKind::NodeUpdated, id, "bounds");
        Ok(())
    }

    /// Sets the display name of `id`.
    pub fn set_name(&mut self, id: EntityId, name: impl Into<String>) -> Result<(), SceneError> {
        let node = self.node_mut(id).ok_or(SceneError::StaleEntity(id))?;
        node.name = Some(name.into());
        self.record(ChangeKind::NodeUpdated, id, "name");
        Ok(())
    }

    /// The last computed world transform of `id`.
    pub fn world_transform(&self, id: EntityId) -> Option<Mat4> {
        self.node(id).map(|n| n.global.0)
    }

    /// The bounding volumes of `id`.
    pub fn bounding_volume(&self, id: EntityId) -> Option<&BoundingVolume> {
        self.node(id).map(|n| &n.bounds)
    }

    /// The parent of `id`, `None` for roots and dead entities.
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// The children of `id`; empty for dead entities.
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Root entities, in spawn order.
    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    /// Finds the first live entity with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.iter()
            .find(|(_, node)| node.name.as_deref() == Some(name))
            .map(|(id, _)| id)
    }

    /// Iterates over all live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Node)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (EntityId::new(index as u32, slot.generation), node))
        })
    }

    /// Pre-order traversal of the subtree rooted at `root`.
    pub fn depth_first(&self, root: EntityId) -> DepthFirst<'_> {
        let stack = if self.contains(root) { vec![root] } else { Vec::new() };
        DepthFirst { scene: self, stack }
    }

    /// Live entities grouped by depth: roots first, then their children, ...
    pub fn levels(&self) -> Vec<Vec<EntityId>> {
        let mut levels = Vec::new();
        let mut current: Vec<EntityId> = self.roots.clone();
        while !current.is_empty() {
            let next = current
                .iter()
                .flat_map(|&id| self.children(id).iter().copied())
                .collect();
            levels.push(std::mem::replace(&mut current, next));
        }
        levels
    }

    /// Takes every change recorded since the last drain.
    pub fn drain_changes(&mut self) -> Vec<SceneChange> {
        std::mem::take(&mut self.changes)
    }

    /// Number of changes waiting to be drained.
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    fn allocate(&mut self, node: Node) -> EntityId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            EntityId::new(index, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            EntityId::new((self.slots.len() - 1) as u32, 0)
        }
    }

    fn detach(&mut self, id: EntityId, parent: Option<EntityId>) {
        match parent {
            Some(parent) => {
                if let Some(p) = self.node_mut(parent) {
                    p.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
    }

    fn ancestors_and_self(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        std::iter::successors(Some(id), move |&current| self.parent(current))
    }

    fn record(&mut self, kind: ChangeKind, subject: EntityId, property: &str) {
        self.changes
            .push(SceneChange::new(kind, subject, property, self.frame));
    }
}

/// Pre-order iterator returned by [`Scene::depth_first`].
pub struct DepthFirst<'a> {
    scene: &'a Scene,
    stack: Vec<EntityId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let id = self.stack.pop()?;
        // Reverse so children come out in insertion order.
        self.stack
            .extend(self.scene.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::math::Vec3;

    fn tree() -> (Scene, EntityId, EntityId, EntityId, EntityId) {
        let mut scene = Scene::new();
        let root = scene.spawn(Transform::default());
        let a = scene.spawn_child(root, Transform::default()).unwrap();
        let b = scene.spawn_child(root, Transform::default()).unwrap();
        let a1 = scene.spawn_child(a, Transform::default()).unwrap();
        (scene, root, a, b, a1)
    }

    #[test]
    fn depth_first_is_pre_order() {
        let (scene, root, a, b, a1) = tree();
        let order: Vec<_> = scene.depth_first(root).collect();
        assert_eq!(order, vec![root, a, a1, b]);
    }

    #[test]
    fn levels_group_by_depth() {
        let (scene, root, a, b, a1) = tree();
        assert_eq!(scene.levels(), vec![vec![root], vec![a, b], vec![a1]]);
    }

    #[test]
    fn despawn_removes_subtree_and_recycles_with_new_generation() {
        let (mut scene, root, a, b, a1) = tree();
        assert_eq!(scene.despawn(a).unwrap(), 2);
        assert_eq!(scene.len(), 2);
        assert!(!scene.contains(a));
        assert!(!scene.contains(a1));
        assert_eq!(scene.children(root), &[b]);

        let fresh = scene.spawn(Transform::default());
        assert!(fresh.index == a.index || fresh.index == a1.index);
        assert_ne!(fresh, a);
        assert_ne!(fresh, a1);
        assert_eq!(scene.set_transform(a, Transform::default()), Err(SceneError::StaleEntity(a)));
    }

    #[test]
    fn reparent_rejects_cycles() {
        let (mut scene, root, a, _b, a1) = tree();
        assert_eq!(
            scene.reparent(a, Some(a1)),
            Err(SceneError::WouldCreateCycle { child: a, parent: a1 })
        );
        assert!(scene.reparent(a, Some(a)).is_err());

        scene.reparent(a1, None).unwrap();
        assert_eq!(scene.parent(a1), None);
        assert_eq!(scene.roots(), &[root, a1]);
        assert!(scene.children(a).is_empty());
    }

    #[test]
    fn mutations_are_recorded_with_frame() {
        let mut scene = Scene::new();
        scene.begin_frame(7);
        let e = scene.spawn(Transform::default());
        scene
            .set_transform(e, Transform::from_translation(Vec3::X))
            .unwrap();
        scene.set_transform_enabled(e, false).unwrap();
        scene.set_transform_enabled(e, false).unwrap();

        let changes = scene.drain_changes();
        let kinds: Vec<_> = changes.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::NodeCreated,
                ChangeKind::NodeUpdated,
                ChangeKind::ComponentRemoved
            ]
        );
        assert!(changes.iter().all(|c| c.frame == 7 && c.subject == e));
        assert_eq!(scene.pending_changes(), 0);
    }

    #[test]
    fn spawn_child_of_dead_parent_fails() {
        let mut scene = Scene::new();
        let root = scene.spawn(Transform::default());
        scene.despawn(root).unwrap();
        assert_eq!(
            scene.spawn_child(root, Transform::default()),
            Err(SceneError::StaleEntity(root))
        );
        assert!(scene.is_empty());
    }
}
