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

use orrery_core::math::Aabb;

/// Bounding volumes of an entity.
///
/// `local` is authored; `world` is `local` under the entity's world
/// transform; `expanded` is `world` merged with the expanded volumes of all
/// children. Entities without geometry keep `local == Aabb::INVALID`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingVolume {
    /// Local-space box.
    pub local: Aabb,
    /// World-space box of this entity alone.
    pub world: Aabb,
    /// World-space box enclosing this entity and its whole subtree.
    pub expanded: Aabb,
}

impl BoundingVolume {
    /// A volume with the given local box and no derived data yet.
    pub fn from_local(local: Aabb) -> Self {
        Self {
            local,
            ..Default::default()
        }
    }
}
