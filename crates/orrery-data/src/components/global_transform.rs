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

use orrery_core::math::{Mat4, Vec3};

/// The world transform of an entity, written by the transform update job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform(pub Mat4);

impl GlobalTransform {
    /// The identity world transform.
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    /// Returns the inner matrix.
    pub fn to_matrix(&self) -> Mat4 {
        self.0
    }

    /// The world-space position of the entity's origin.
    pub fn translation(&self) -> Vec3 {
        self.0.translation()
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for GlobalTransform {
    fn from(m: Mat4) -> Self {
        Self(m)
    }
}
