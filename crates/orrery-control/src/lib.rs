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

//! # Orrery Control
//!
//! The aspect engine. Each tick it forwards scene changes to observers,
//! collects the jobs of every registered aspect in priority order and runs
//! them on a worker pool, honouring their dependencies.

#![warn(missing_docs)]

pub mod arbiter;
pub mod config;
pub mod engine;
pub mod registry;
pub mod scheduler;

pub use arbiter::{ChangeArbiter, ObserverId};
pub use config::{AspectConfig, ConfigError, EngineConfig};
pub use engine::{AspectEngine, EngineError};
pub use registry::AspectRegistry;
pub use scheduler::{FrameReport, JobScheduler, ScheduleError};
