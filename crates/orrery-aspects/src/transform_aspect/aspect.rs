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


use std::any::Any;

use orrery_core::aspect::{Aspect, AspectKind, FrameTime};
use orrery_core::change::{ChangeSender, ObserverId};
use orrery_core::job::JobHandle;
use orrery_core::EngineContext;
use orrery_data::SceneHandle;
use orrery_jobs::{ExpandBoundingVolumeJob, PropagationMode, UpdateWorldTransformJob};

use super::backend::{DirtyTransforms, NotifyWorldTransformJob, TransformObserver, OBSERVED_CHANGES};

/// Emits, every tick, the world-transform update followed by the
/// bounding-volume expansion that depends on it.
///
/// The aspect has nothing to do until it knows a scene, either from
/// [`with_scene`](Self::with_scene) or from the engine at registration.
/// When the engine routes changes, the aspect also observes transform
/// edits and, in frames following one, emits a job announcing the moved
/// world transforms.
pub struct TransformAspect {
    scene: Option<SceneHandle>,
    mode: PropagationMode,
    // Set when the mode was chosen explicitly; the engine default is then ignored.
    mode_pinned: bool,
    dirty: DirtyTransforms,
    sender: Option<ChangeSender>,
    observer: Option<ObserverId>,
    jobs: Vec<JobHandle>,
    notify: Option<JobHandle>,
}

impl TransformAspect {
    /// Creates an aspect with no scene, following the engine's propagation
    /// strategy.
    pub fn new() -> Self {
        Self {
            scene: None,
            mode: PropagationMode::default(),
            mode_pinned: false,
            dirty: DirtyTransforms::default(),
            sender: None,
            observer: None,
            jobs: Vec::new(),
            notify: None,
        }
    }

    /// Creates an aspect bound to `scene` with a fixed `mode`. Both are kept
    /// when the aspect joins an engine.
    pub fn with_scene(scene: SceneHandle, mode: PropagationMode) -> Self {
        let mut aspect = Self::new();
        aspect.mode = mode;
        aspect.mode_pinned = true;
        aspect.scene = Some(scene);
        aspect.rebuild_jobs();
        aspect
    }

    /// The propagation strategy in use.
    pub fn mode(&self) -> PropagationMode {
        self.mode
    }

    /// Switches the propagation strategy from the next tick on.
    pub fn set_mode(&mut self, mode: PropagationMode) {
        self.mode_pinned = true;
        if self.mode != mode {
            self.mode = mode;
            self.rebuild_jobs();
        }
    }

    /// The scene this aspect works on.
    pub fn scene(&self) -> Option<&SceneHandle> {
        self.scene.as_ref()
    }

    /// The backend observer registered with the engine, if any.
    pub fn observer(&self) -> Option<ObserverId> {
        self.observer
    }

    /// Entities whose moved world transform is still to be announced.
    pub fn pending_notifications(&self) -> usize {
        self.dirty.len()
    }

    fn rebuild_jobs(&mut self) {
        self.jobs.clear();
        self.notify = None;
        let Some(scene) = &self.scene else {
            return;
        };
        let update = JobHandle::new(UpdateWorldTransformJob::new(scene.clone(), self.mode));
        let expand = JobHandle::new(ExpandBoundingVolumeJob::new(scene.clone())).with_dependency(&update);
        self.notify = self.sender.as_ref().map(|sender| {
            JobHandle::new(NotifyWorldTransformJob::new(
                scene.clone(),
                self.dirty.clone(),
                sender.clone(),
            ))
            .with_dependency(&update)
        });
        self.jobs = vec![update, expand];
    }
}

impl Default for TransformAspect {
    fn default() -> Self {
        Self::new()
    }
}

impl Aspect for TransformAspect {
    fn kind(&self) -> AspectKind {
        AspectKind::Transform
    }

    fn on_register(&mut self, context: &mut EngineContext<'_>) {
        if !self.mode_pinned {
            self.mode = context.propagation;
        }
        if self.scene.is_none() {
            match context.scene_as::<SceneHandle>() {
                Some(scene) => self.scene = Some(scene.clone()),
                None => log::warn!("TransformAspect: engine context carries no scene"),
            }
        } else {
            log::debug!("TransformAspect: keeping its own scene");
        }

        self.sender = context.change_sender();
        self.observer = context.register_observer(
            None,
            OBSERVED_CHANGES,
            Box::new(TransformObserver::new(self.dirty.clone())),
        );
        self.rebuild_jobs();
        log::info!(
            "TransformAspect: registered ({:?}, observer: {})",
            self.mode,
            self.observer.map_or_else(|| "none".to_string(), |id| id.to_string())
        );
    }

    fn jobs_to_execute(&mut self, _time: FrameTime) -> Vec<JobHandle> {
        let mut jobs = self.jobs.clone();
        if let Some(notify) = &self.notify {
            if !self.dirty.is_empty() {
                jobs.push(notify.clone());
            }
        }
        jobs
    }

    fn on_shutdown(&mut self) {
        self.jobs.clear();
        self.notify = None;
        self.sender = None;
        self.scene = None;
        self.dirty.take();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::change::{ChangeFlags, ChangeKind, ObserverRegistry, SceneChange, SceneObserver};
    use orrery_core::ecs::EntityId;
    use orrery_data::Scene;
    use std::time::Duration;

    const T0: FrameTime = FrameTime {
        frame: 0,
        now: Duration::ZERO,
    };

    /// Keeps observers so tests can feed them changes by hand.
    struct Routing {
        sender: ChangeSender,
        observers: Vec<Box<dyn SceneObserver>>,
    }

    impl Routing {
        fn new() -> (Self, flume::Receiver<SceneChange>) {
            let (sender, receiver) = flume::unbounded();
            (
                Self {
                    sender,
                    observers: Vec::new(),
                },
                receiver,
            )
        }
    }

    impl ObserverRegistry for Routing {
        fn register_observer(
            &mut self,
            _subject: Option<EntityId>,
            _kinds: ChangeFlags,
            observer: Box<dyn SceneObserver>,
        ) -> ObserverId {
            self.observers.push(observer);
            ObserverId::from_raw(self.observers.len() as u64)
        }

        fn unregister_observer(&mut self, _id: ObserverId) -> bool {
            false
        }

        fn change_sender(&self) -> ChangeSender {
            self.sender.clone()
        }
    }

    #[test]
    fn no_scene_means_no_jobs() {
        let mut aspect = TransformAspect::new();
        aspect.on_register(&mut EngineContext::empty());
        assert!(aspect.jobs_to_execute(T0).is_empty());
    }

    #[test]
    fn registration_picks_up_scene_and_mode_from_context() {
        let scene = Scene::new().into_handle();
        let mut aspect = TransformAspect::new();
        aspect.on_register(&mut EngineContext::new(&scene, 2).with_propagation(PropagationMode::PerLevel));

        assert_eq!(aspect.mode(), PropagationMode::PerLevel);
        let jobs = aspect.jobs_to_execute(T0);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name(), UpdateWorldTransformJob::NAME);
        assert_eq!(jobs[1].name(), ExpandBoundingVolumeJob::NAME);
        assert_eq!(jobs[1].dependencies(), &[jobs[0].id()]);
    }

    #[test]
    fn explicit_scene_and_mode_survive_registration() {
        let own = Scene::new().into_handle();
        let engine_scene = Scene::new().into_handle();
        let mut aspect = TransformAspect::with_scene(own.clone(), PropagationMode::PerLevel);
        aspect.on_register(&mut EngineContext::new(&engine_scene, 2).with_propagation(PropagationMode::DepthFirst));

        assert_eq!(aspect.mode(), PropagationMode::PerLevel);
        assert!(std::sync::Arc::ptr_eq(aspect.scene().unwrap(), &own));
    }

    #[test]
    fn mode_change_rebuilds_jobs() {
        let scene = Scene::new().into_handle();
        let mut aspect = TransformAspect::with_scene(scene, PropagationMode::DepthFirst);
        let before = aspect.jobs_to_execute(T0)[0].id();

        aspect.set_mode(PropagationMode::PerLevel);
        let after = aspect.jobs_to_execute(T0);
        assert_eq!(aspect.mode(), PropagationMode::PerLevel);
        assert_ne!(after[0].id(), before);
        assert_eq!(after[1].dependencies(), &[after[0].id()]);
    }

    #[test]
    fn transform_edits_add_a_notify_job() {
        let scene = Scene::new().into_handle();
        let (mut routing, _receiver) = Routing::new();
        let mut aspect = TransformAspect::new();
        aspect.on_register(&mut EngineContext::new(&scene, 1).with_changes(&mut routing));
        assert!(aspect.observer().is_some());
        assert_eq!(aspect.jobs_to_execute(T0).len(), 2);

        let moved = SceneChange::new(ChangeKind::NodeUpdated, EntityId::new(0, 0), "transform", 0);
        routing.observers[0].scene_change(&moved);
        assert_eq!(aspect.pending_notifications(), 1);

        let jobs = aspect.jobs_to_execute(T0);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[2].name(), NotifyWorldTransformJob::NAME);
        assert_eq!(jobs[2].dependencies(), &[jobs[0].id()]);
    }

    #[test]
    fn shutdown_releases_scene() {
        let scene = Scene::new().into_handle();
        let mut aspect = TransformAspect::with_scene(scene.clone(), PropagationMode::DepthFirst);
        aspect.on_shutdown();
        assert!(aspect.scene().is_none());
        assert!(aspect.jobs_to_execute(T0).is_empty());
        assert_eq!(std::sync::Arc::strong_count(&scene), 1);
    }
}
