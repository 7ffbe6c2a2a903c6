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

//! Traits for pluggable engine subsystems (Aspects).
//!
//! An aspect owns the backend state of one concern of the simulation (game
//! logic callbacks, spatial transforms, ...) together with the observers
//! that keep that state in sync with the scene, and, once per engine tick,
//! hands the engine the [`JobHandle`]s to execute for that frame.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use crate::job::JobHandle;
use crate::EngineContext;

/// The closed set of aspect kinds the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AspectKind {
    /// Per-frame user callbacks.
    Logic,
    /// World-transform and bounding-volume maintenance.
    Transform,
}

impl AspectKind {
    /// Every kind, in declaration order.
    pub const ALL: [AspectKind; 2] = [AspectKind::Logic, AspectKind::Transform];

    /// The stable configuration name of this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AspectKind::Logic => "logic",
            AspectKind::Transform => "transform",
        }
    }

    /// Parses a configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for AspectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-clock time sampled at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTime {
    /// Zero-based frame counter.
    pub frame: u64,
    /// Time since the engine started.
    pub now: Duration,
}

/// A pluggable engine subsystem.
pub trait Aspect: Send {
    /// The kind of this aspect.
    fn kind(&self) -> AspectKind;

    /// The name this aspect is registered under.
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Called once when the aspect joins an engine.
    ///
    /// This is where an aspect attaches its backend observers to the
    /// engine's change routing and picks up the shared scene.
    fn on_register(&mut self, _context: &mut EngineContext<'_>) {}

    /// Returns the jobs to run for this frame.
    ///
    /// Called exactly once per tick, in aspect priority order.
    fn jobs_to_execute(&mut self, time: FrameTime) -> Vec<JobHandle>;

    /// Tears the aspect down.
    ///
    /// Must not block: work that was queued but not started is discarded,
    /// never awaited.
    fn on_shutdown(&mut self) {}

    /// Allows downcasting to concrete aspect types.
    fn as_any(&self) -> &dyn Any;

    /// Allows mutable downcasting to concrete aspect types.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in AspectKind::ALL {
            assert_eq!(AspectKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(AspectKind::from_name("render"), None);
        assert_eq!(AspectKind::Transform.to_string(), "transform");
    }
}
