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

//! # Orrery Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! shared by every other Orrery crate: the math primitives, entity identity,
//! the [`Job`](job::Job) and [`Aspect`](aspect::Aspect) contracts, job graph
//! ordering and scene-change notifications.

#![warn(missing_docs)]

pub mod aspect;
pub mod change;
pub mod context;
pub mod ecs;
pub mod graph;
pub mod job;
pub mod math;

pub use context::{EngineContext, PropagationMode};
