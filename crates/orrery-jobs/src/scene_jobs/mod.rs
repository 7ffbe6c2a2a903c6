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

//! Jobs maintaining derived spatial data on the scene.

use std::sync::RwLockWriteGuard;

use orrery_core::job::JobError;
use orrery_data::{Scene, SceneHandle};

mod expand_bounding_volume;
mod update_world_transform;

pub use expand_bounding_volume::{expand_bounding_volumes, ExpandBoundingVolumeJob};
pub use update_world_transform::{
    update_world_transforms, update_world_transforms_per_level, PropagationMode,
    UpdateWorldTransformJob,
};

/// Write-locks the scene on behalf of the job `job`.
fn lock_scene<'a>(scene: &'a SceneHandle, job: &str) -> Result<RwLockWriteGuard<'a, Scene>, JobError> {
    scene
        .write()
        .map_err(|_| JobError::failed(job, "scene lock poisoned"))
}
