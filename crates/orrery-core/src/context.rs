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


//! The context handed to aspects when they join an engine.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::change::{ChangeFlags, ChangeSender, ObserverId, ObserverRegistry, SceneObserver};
use crate::ecs::EntityId;

/// How world transforms are propagated through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Single-threaded pre-order walk from every root.
    #[default]
    DepthFirst,
    /// One depth level at a time, nodes of a level in parallel.
    PerLevel,
}

/// Engine-owned data made available to an aspect during registration.
///
/// `orrery-core` knows nothing about concrete scene types, so the scene is
/// passed type-erased. Aspects downcast it to the handle type they expect
/// (`orrery_data::SceneHandle` for the built-in ones).
pub struct EngineContext<'a> {
    /// The shared scene, if the engine owns one.
    pub scene: Option<&'a (dyn Any + Send + Sync)>,
    /// The number of worker threads the engine's scheduler runs on.
    pub worker_threads: usize,
    /// The engine's configured propagation strategy. Aspects that were not
    /// given one explicitly follow it.
    pub propagation: PropagationMode,
    changes: Option<&'a mut dyn ObserverRegistry>,
}

impl<'a> EngineContext<'a> {
    /// Creates a context exposing `scene` to aspects.
    pub fn new(scene: &'a (dyn Any + Send + Sync), worker_threads: usize) -> Self {
        Self {
            scene: Some(scene),
            worker_threads,
            propagation: PropagationMode::default(),
            changes: None,
        }
    }

    /// A context with no scene attached.
    pub fn empty() -> Self {
        Self {
            scene: None,
            worker_threads: 0,
            propagation: PropagationMode::default(),
            changes: None,
        }
    }

    /// Sets the propagation strategy aspects should default to.
    pub fn with_propagation(mut self, propagation: PropagationMode) -> Self {
        self.propagation = propagation;
        self
    }

    /// Lets aspects register observers with, and post changes to, `changes`.
    pub fn with_changes(mut self, changes: &'a mut dyn ObserverRegistry) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Downcasts the scene to `T`.
    pub fn scene_as<T: 'static>(&self) -> Option<&T> {
        self.scene.and_then(|scene| scene.downcast_ref::<T>())
    }

    /// Registers a backend observer. Returns `None` when the engine exposes
    /// no change routing.
    pub fn register_observer(
        &mut self,
        subject: Option<EntityId>,
        kinds: ChangeFlags,
        observer: Box<dyn SceneObserver>,
    ) -> Option<ObserverId> {
        self.changes
            .as_deref_mut()
            .map(|changes| changes.register_observer(subject, kinds, observer))
    }

    /// A sender for posting changes back to observers, if change routing is
    /// available.
    pub fn change_sender(&self) -> Option<ChangeSender> {
        self.changes.as_deref().map(|changes| changes.change_sender())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{ChangeKind, SceneChange};

    struct Registry {
        sender: ChangeSender,
        observers: Vec<(Option<EntityId>, ChangeFlags)>,
    }

    impl ObserverRegistry for Registry {
        fn register_observer(
            &mut self,
            subject: Option<EntityId>,
            kinds: ChangeFlags,
            _observer: Box<dyn SceneObserver>,
        ) -> ObserverId {
            self.observers.push((subject, kinds));
            ObserverId::from_raw(self.observers.len() as u64)
        }

        fn unregister_observer(&mut self, _id: ObserverId) -> bool {
            false
        }

        fn change_sender(&self) -> ChangeSender {
            self.sender.clone()
        }
    }

    struct Ignore;

    impl SceneObserver for Ignore {
        fn scene_change(&mut self, _change: &SceneChange) {}
    }

    #[test]
    fn scene_downcast_matches_concrete_type() {
        let value = 42u32;
        let ctx = EngineContext::new(&value, 2);
        assert_eq!(ctx.scene_as::<u32>(), Some(&42));
        assert!(ctx.scene_as::<String>().is_none());
        assert!(EngineContext::empty().scene_as::<u32>().is_none());
    }

    #[test]
    fn observers_need_change_routing() {
        let mut ctx = EngineContext::empty();
        assert!(ctx
            .register_observer(None, ChangeFlags::ALL, Box::new(Ignore))
            .is_none());
        assert!(ctx.change_sender().is_none());
    }

    #[test]
    fn routed_context_registers_and_sends() {
        let (sender, receiver) = flume::unbounded();
        let mut registry = Registry {
            sender,
            observers: Vec::new(),
        };
        {
            let mut ctx = EngineContext::empty()
                .with_propagation(PropagationMode::PerLevel)
                .with_changes(&mut registry);
            assert_eq!(ctx.propagation, PropagationMode::PerLevel);

            let id = ctx.register_observer(None, ChangeFlags::NODE_UPDATED, Box::new(Ignore));
            assert_eq!(id, Some(ObserverId::from_raw(1)));

            let reply = SceneChange::new(ChangeKind::NodeUpdated, EntityId::new(3, 0), "reply", 0);
            ctx.change_sender().unwrap().send(reply.clone()).unwrap();
            assert_eq!(receiver.try_recv().unwrap(), reply);
        }
        assert_eq!(registry.observers, vec![(None, ChangeFlags::NODE_UPDATED)]);
    }
}
