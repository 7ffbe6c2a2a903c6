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

//! # Orrery Jobs
//!
//! The concrete per-frame work items aspects hand to the scheduler.
//!
//! - [`scene_jobs`]: world-transform propagation and bounding-volume expansion.
//! - [`logic_jobs`]: user callback invocation.

#![warn(missing_docs)]

pub mod logic_jobs;
pub mod scene_jobs;

pub use logic_jobs::{CallbackId, CallbackJob, LogicFrame, LogicManager};
pub use scene_jobs::{
    expand_bounding_volumes, update_world_transforms, update_world_transforms_per_level,
    ExpandBoundingVolumeJob, PropagationMode, UpdateWorldTransformJob,
};
