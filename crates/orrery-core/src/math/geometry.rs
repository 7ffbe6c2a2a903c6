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

//! Bounding volumes for the scene graph.

use serde::{Deserialize, Serialize};

use super::{Mat4, Vec3};

/// An Axis-Aligned Bounding Box (AABB).
///
/// Entities carry one in local space; the transform job derives the
/// world-space box from it and the expansion job merges boxes up the tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Aabb {
    /// The corner of the box with the smallest coordinates on all axes.
    pub min: Vec3,
    /// The corner of the box with the largest coordinates on all axes.
    pub max: Vec3,
}

impl Aabb {
    /// An empty box (`min = +inf`, `max = -inf`).
    ///
    /// Neutral element for [`merge`](Self::merge): merging any box with
    /// `INVALID` yields that box.
    pub const INVALID: Self = Self {
        min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
        max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    /// Creates a box from two corners given in any order.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box from a center and half-extents (made non-negative).
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Center point of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half the size on each axis.
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// `true` when `min <= max` on all axes. Degenerate boxes are valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Checks if a point lies within or on the boundary of the box.
    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Checks if `other` lies entirely inside this box, with a tolerance.
    pub fn contains_aabb(&self, other: &Aabb, epsilon: f32) -> bool {
        if !other.is_valid() {
            return true;
        }
        other.min.x >= self.min.x - epsilon
            && other.min.y >= self.min.y - epsilon
            && other.min.z >= self.min.z - epsilon
            && other.max.x <= self.max.x + epsilon
            && other.max.y <= self.max.y + epsilon
            && other.max.z <= self.max.z + epsilon
    }

    /// Smallest box enclosing both boxes.
    #[inline]
    pub fn merge(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Computes the box enclosing this one after an affine transformation.
    ///
    /// The center is transformed as a point and the new half-extents are the
    /// old ones projected on the absolute values of the matrix axes. An
    /// invalid box stays invalid.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        if !self.is_valid() {
            return *self;
        }

        let center = matrix.transform_point3(self.center());
        let h = self.half_extents();
        let axis = |c: usize| {
            Vec3::new(
                matrix.cols[c][0].abs(),
                matrix.cols[c][1].abs(),
                matrix.cols[c][2].abs(),
            )
        };
        let half_extents = axis(0) * h.x + axis(1) * h.y + axis(2) * h.z;

        Self::from_center_half_extents(center, half_extents)
    }
}

impl Default for Aabb {
    /// Returns [`Aabb::INVALID`].
    #[inline]
    fn default() -> Self {
        Self::INVALID
    }
}
