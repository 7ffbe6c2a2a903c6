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

//! Aspect registry for ordered per-tick iteration.

use orrery_core::aspect::{Aspect, AspectKind, FrameTime};
use orrery_core::job::JobHandle;

/// Entry in the aspect registry containing the aspect and its priority.
struct AspectEntry {
    aspect: Box<dyn Aspect>,
    priority: f32,
}

/// Registry that owns the engine's aspects, sorted by priority.
///
/// Higher priority aspects are asked for their jobs first; aspects of equal
/// priority keep their registration order.
#[derive(Default)]
pub struct AspectRegistry {
    entries: Vec<AspectEntry>,
}

impl AspectRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an aspect with the given priority.
    pub fn register(&mut self, aspect: Box<dyn Aspect>, priority: f32) {
        log::info!(
            "AspectRegistry: Registered '{}' (priority={:.2})",
            aspect.name(),
            priority
        );

        self.entries.push(AspectEntry { aspect, priority });
        self.entries.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Returns the number of registered aspects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no aspects are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the aspects in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Aspect> {
        self.entries.iter().map(|e| e.aspect.as_ref())
    }

    /// Aspect names in priority order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.aspect.name()).collect()
    }

    /// The highest-priority aspect of `kind`.
    pub fn get(&self, kind: AspectKind) -> Option<&dyn Aspect> {
        self.iter().find(|a| a.kind() == kind)
    }

    /// The first registered aspect of concrete type `T`.
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find_map(|e| e.aspect.as_any_mut().downcast_mut::<T>())
    }

    /// Asks every aspect, in priority order, for its jobs of this frame.
    pub fn collect_jobs(&mut self, time: FrameTime) -> Vec<JobHandle> {
        let mut jobs = Vec::new();
        for entry in &mut self.entries {
            let emitted = entry.aspect.jobs_to_execute(time);
            log::trace!(
                "AspectRegistry: '{}' emitted {} jobs for frame {}",
                entry.aspect.name(),
                emitted.len(),
                time.frame
            );
            jobs.extend(emitted);
        }
        jobs
    }

    /// Shuts every aspect down in priority order.
    pub fn shutdown_all(&mut self) {
        for entry in &mut self.entries {
            entry.aspect.on_shutdown();
        }
    }
}
