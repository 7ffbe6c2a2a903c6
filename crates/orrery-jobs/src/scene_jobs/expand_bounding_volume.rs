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

use orrery_core::job::{Job, JobContext, JobError};
use orrery_core::math::Aabb;
use orrery_data::{Scene, SceneHandle};

use super::lock_scene;

/// Merges world bounding boxes bottom-up so every entity's `expanded` box
/// encloses its whole subtree.
///
/// Reads `bounds.world`, so it must run after the world-transform update of
/// the same frame. Returns the number of visited entities.
pub fn expand_bounding_volumes(scene: &mut Scene) -> usize {
    let levels = scene.levels();
    let mut visited = 0;

    for level in levels.iter().rev() {
        for &id in level {
            let from_children = scene
                .children(id)
                .iter()
                .filter_map(|&child| scene.bounding_volume(child))
                .fold(Aabb::INVALID, |acc, b| acc.merge(&b.expanded));

            if let Some(node) = scene.node_mut(id) {
                node.bounds.expanded = node.bounds.world.merge(&from_children);
                visited += 1;
            }
        }
    }
    visited
}

/// Job wrapper around [`expand_bounding_volumes`].
pub struct ExpandBoundingVolumeJob {
    scene: SceneHandle,
}

impl ExpandBoundingVolumeJob {
    /// The job's name as reported in logs.
    pub const NAME: &'static str = "expand_bounding_volume";

    /// Creates the job for `scene`.
    pub fn new(scene: SceneHandle) -> Self {
        Self { scene }
    }
}

impl Job for ExpandBoundingVolumeJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        let mut scene = lock_scene(&self.scene, Self::NAME)?;
        let visited = expand_bounding_volumes(&mut scene);
        log::trace!("{}: {} entities expanded", Self::NAME, visited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_jobs::update_world_transforms;
    use orrery_core::math::{Vec3, EPSILON};
    use orrery_data::Transform;

    #[test]
    fn parent_encloses_descendants() {
        let mut scene = Scene::new();
        let unit = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5));

        let root = scene.spawn(Transform::default());
        let left = scene
            .spawn_child(root, Transform::from_translation(Vec3::new(-5.0, 0.0, 0.0)))
            .unwrap();
        let right = scene
            .spawn_child(root, Transform::from_translation(Vec3::new(5.0, 0.0, 0.0)))
            .unwrap();
        let far = scene
            .spawn_child(right, Transform::from_translation(Vec3::new(0.0, 10.0, 0.0)))
            .unwrap();
        for id in [left, far] {
            scene.set_local_bounds(id, unit).unwrap();
        }

        update_world_transforms(&mut scene);
        assert_eq!(expand_bounding_volumes(&mut scene), 4);

        let root_box = scene.bounding_volume(root).unwrap().expanded;
        for id in [left, right, far] {
            let b = scene.bounding_volume(id).unwrap();
            assert!(root_box.contains_aabb(&b.expanded, EPSILON));
            assert!(root_box.contains_aabb(&b.world, EPSILON));
        }
        assert!(root_box.min.approx_eq(Vec3::new(-5.5, -0.5, -0.5), EPSILON));
        assert!(root_box.max.approx_eq(Vec3::new(5.5, 10.5, 0.5), EPSILON));

        // `right` has no geometry of its own but still encloses `far`.
        let right_box = scene.bounding_volume(right).unwrap();
        assert!(!right_box.world.is_valid());
        assert!(right_box.expanded.is_valid());
    }

    #[test]
    fn empty_subtree_stays_invalid() {
        let mut scene = Scene::new();
        let root = scene.spawn(Transform::default());
        scene.spawn_child(root, Transform::default()).unwrap();
        update_world_transforms(&mut scene);
        expand_bounding_volumes(&mut scene);
        assert!(!scene.bounding_volume(root).unwrap().expanded.is_valid());
    }
}
