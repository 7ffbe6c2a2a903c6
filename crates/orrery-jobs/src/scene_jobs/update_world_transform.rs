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

use orrery_core::ecs::EntityId;
use orrery_core::job::{Job, JobContext, JobError};
use orrery_core::math::{Aabb, Mat4};
pub use orrery_core::PropagationMode;
use orrery_data::{GlobalTransform, Scene, SceneHandle, Transform};
use rayon::prelude::*;

use super::lock_scene;

#[inline]
fn compose(parent_world: Mat4, local: &Transform) -> Mat4 {
    if local.enabled {
        parent_world * local.to_mat4()
    } else {
        parent_world
    }
}

/// Recomputes the world transform and world bounding box of every entity.
///
/// Pre-order walk: each node composes its parent's world matrix with its own
/// local transform, so a parent is always written before its children.
/// Returns the number of visited entities.
pub fn update_world_transforms(scene: &mut Scene) -> usize {
    let mut stack: Vec<(EntityId, Mat4)> = scene
        .roots()
        .iter()
        .rev()
        .map(|&root| (root, Mat4::IDENTITY))
        .collect();

    let mut visited = 0;
    while let Some((id, parent_world)) = stack.pop() {
        let Some(node) = scene.node_mut(id) else {
            continue;
        };
        let world = compose(parent_world, &node.transform);
        node.global = GlobalTransform(world);
        node.bounds.world = node.bounds.local.transform(&world);
        visited += 1;

        stack.extend(node.children().iter().rev().map(|&child| (child, world)));
    }
    visited
}

/// Same result as [`update_world_transforms`], computed level by level.
///
/// Nodes of one depth only read their parent's world matrix, which the
/// previous level already wrote, so each level is computed in parallel and
/// written back before moving on.
pub fn update_world_transforms_per_level(scene: &mut Scene) -> usize {
    let levels = scene.levels();
    let mut visited = 0;

    for level in &levels {
        let results: Vec<(EntityId, Mat4, Aabb)> = {
            let shared: &Scene = scene;
            level
                .par_iter()
                .filter_map(|&id| {
                    let node = shared.node(id)?;
                    let parent_world = node
                        .parent()
                        .and_then(|p| shared.world_transform(p))
                        .unwrap_or(Mat4::IDENTITY);
                    let world = compose(parent_world, &node.transform);
                    Some((id, world, node.bounds.local.transform(&world)))
                })
                .collect()
        };

        visited += results.len();
        for (id, world, bounds) in results {
            if let Some(node) = scene.node_mut(id) {
                node.global = GlobalTransform(world);
                node.bounds.world = bounds;
            }
        }
    }
    visited
}

/// Propagates local transforms to world transforms for the whole scene.
pub struct UpdateWorldTransformJob {
    scene: SceneHandle,
    mode: PropagationMode,
}

impl UpdateWorldTransformJob {
    /// The job's name as reported in logs.
    pub const NAME: &'static str = "update_world_transform";

    /// Creates the job for `scene`.
    pub fn new(scene: SceneHandle, mode: PropagationMode) -> Self {
        Self { scene, mode }
    }
}

impl Job for UpdateWorldTransformJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        let mut scene = lock_scene(&self.scene, Self::NAME)?;
        let visited = match self.mode {
            PropagationMode::DepthFirst => update_world_transforms(&mut scene),
            PropagationMode::PerLevel => update_world_transforms_per_level(&mut scene),
        };
        log::trace!(
            "{}: {} entities updated (frame {}, {:?})",
            Self::NAME,
            visited,
            ctx.frame,
            self.mode
        );
        Ok(())
    }
}
