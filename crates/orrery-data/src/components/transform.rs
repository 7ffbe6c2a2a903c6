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

use orrery_core::math::{Mat4, Quaternion, Vec3};
use serde::{Deserialize, Serialize};

/// The local transform of an entity, relative to its parent.
///
/// A disabled transform is skipped during world-transform propagation: the
/// entity then inherits its parent's world transform unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// The translation (position) of the entity.
    pub translation: Vec3,
    /// The rotation of the entity, represented as a quaternion.
    pub rotation: Quaternion,
    /// The scale of the entity.
    pub scale: Vec3,
    /// Whether this transform takes part in propagation.
    pub enabled: bool,
}

impl Transform {
    /// Creates a new `Transform` with a given translation, rotation, and scale.
    pub fn new(translation: Vec3, rotation: Quaternion, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
            enabled: true,
        }
    }

    /// Creates a new `Transform` with a given translation, and identity rotation/scale.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Creates a new `Transform` with a given rotation.
    pub fn from_rotation(rotation: Quaternion) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    /// Creates a new `Transform` with a given scale.
    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::identity()
        }
    }

    /// The identity `Transform`.
    pub fn identity() -> Self {
        Self::new(Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE)
    }

    /// Returns a copy with `enabled` set.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Calculates the matrix of this transform in `Scale -> Rotate -> Translate` order.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    /// Returns the identity `Transform`.
    fn default() -> Self {
        Self::identity()
    }
}
