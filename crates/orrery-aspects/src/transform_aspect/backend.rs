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


//! Backend node handling for the transform aspect.
//!
//! [`TransformObserver`] is registered with the engine's change routing and
//! marks every entity whose local transform or parent changed. Once world
//! transforms were recomputed, [`NotifyWorldTransformJob`] replies from the
//! worker with one `world_transform` update per affected entity, delivered
//! to frontend observers at the next sync.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use orrery_core::change::{ChangeFlags, ChangeKind, ChangeSender, SceneChange, SceneObserver};
use orrery_core::ecs::EntityId;
use orrery_core::job::{Job, JobContext, JobError};
use orrery_data::SceneHandle;

/// Property name of the changes posted after world transforms moved.
pub const WORLD_TRANSFORM_PROPERTY: &str = "world_transform";

/// Change kinds the backend observer listens to.
pub const OBSERVED_CHANGES: ChangeFlags = ChangeFlags::NODE_UPDATED
    .union(ChangeFlags::COMPONENT_ADDED)
    .union(ChangeFlags::COMPONENT_REMOVED);

/// Entities whose world transform needs to be re-announced.
#[derive(Debug, Clone, Default)]
pub struct DirtyTransforms(Arc<Mutex<BTreeSet<EntityId>>>);

impl DirtyTransforms {
    fn lock(&self) -> MutexGuard<'_, BTreeSet<EntityId>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks `id` as dirty.
    pub fn mark(&self, id: EntityId) {
        self.lock().insert(id);
    }

    /// Empties the set, returning its content in id order.
    pub fn take(&self) -> Vec<EntityId> {
        std::mem::take(&mut *self.lock()).into_iter().collect()
    }

    /// Number of marked entities.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Marks entities whose local transform, enabled state or parent changed.
pub struct TransformObserver {
    dirty: DirtyTransforms,
}

impl TransformObserver {
    /// Creates an observer feeding `dirty`.
    pub fn new(dirty: DirtyTransforms) -> Self {
        Self { dirty }
    }
}

impl SceneObserver for TransformObserver {
    fn scene_change(&mut self, change: &SceneChange) {
        let relevant = matches!(change.property.as_str(), "transform" | "parent")
            && matches!(
                change.kind,
                ChangeKind::NodeUpdated | ChangeKind::ComponentAdded | ChangeKind::ComponentRemoved
            );
        if relevant {
            self.dirty.mark(change.subject);
        }
    }
}

/// Posts a `world_transform` update for every dirty entity and its
/// descendants.
pub struct NotifyWorldTransformJob {
    scene: SceneHandle,
    dirty: DirtyTransforms,
    sender: ChangeSender,
}

impl NotifyWorldTransformJob {
    /// The job's name as reported in logs.
    pub const NAME: &'static str = "notify_world_transform";

    /// Creates the job.
    pub fn new(scene: SceneHandle, dirty: DirtyTransforms, sender: ChangeSender) -> Self {
        Self { scene, dirty, sender }
    }
}

impl Job for NotifyWorldTransformJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        let dirty = self.dirty.take();
        if dirty.is_empty() {
            return Ok(());
        }

        let moved: BTreeSet<EntityId> = {
            let guard = self
                .scene
                .read()
                .map_err(|_| JobError::failed(Self::NAME, "scene lock poisoned"))?;
            let scene = &*guard;
            dirty
                .into_iter()
                .filter(|&id| scene.contains(id))
                .flat_map(|id| scene.depth_first(id))
                .collect()
        };

        for &id in &moved {
            let reply = SceneChange::new(ChangeKind::NodeUpdated, id, WORLD_TRANSFORM_PROPERTY, ctx.frame);
            if self.sender.send(reply).is_err() {
                log::debug!("{}: change routing is gone", Self::NAME);
                return Ok(());
            }
        }
        log::trace!("{}: {} entities moved (frame {})", Self::NAME, moved.len(), ctx.frame);
        Ok(())
    }
}
