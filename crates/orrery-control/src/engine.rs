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

//! The aspect engine and its tick loop.

use std::time::{Duration, Instant};

use orrery_aspects::AspectFactory;
use orrery_core::aspect::{Aspect, FrameTime};
use orrery_core::change::{ChangeFlags, SceneObserver};
use orrery_core::ecs::EntityId;
use orrery_core::EngineContext;
use orrery_data::{Scene, SceneHandle};
use orrery_telemetry::{FrameMetrics, MetricsError, MetricsRegistry};

use crate::arbiter::{ChangeArbiter, ObserverId};
use crate::config::{ConfigError, EngineConfig};
use crate::registry::AspectRegistry;
use crate::scheduler::{FrameReport, JobScheduler, ScheduleError};

/// Errors raised by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A frame was rejected by the scheduler.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    /// Metrics could not be registered.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    /// A job panicked while holding the scene lock.
    #[error("scene lock poisoned")]
    ScenePoisoned,
    /// The engine was shut down.
    #[error("engine is shut down")]
    ShutDown,
}

/// Owns the scene, the aspects and the worker pool, and drives ticks.
///
/// ```rust,ignore
/// let mut engine = AspectEngine::from_config(EngineConfig::default(), &AspectFactory::with_builtin())?;
/// engine.scene().write().unwrap().spawn(Transform::default());
/// engine.run_for(10)?;
/// engine.shutdown();
/// ```
pub struct AspectEngine {
    config: EngineConfig,
    scene: SceneHandle,
    registry: AspectRegistry,
    scheduler: JobScheduler,
    arbiter: ChangeArbiter,
    metrics: FrameMetrics,
    frame: u64,
    started: Instant,
    last_tick: Option<Duration>,
    shut_down: bool,
}

impl AspectEngine {
    /// Creates an engine with an empty scene and no aspects.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_scene(config, Scene::new().into_handle())
    }

    /// Creates an engine around an existing scene.
    pub fn with_scene(config: EngineConfig, scene: SceneHandle) -> Result<Self, EngineError> {
        config.validate()?;
        let metrics = FrameMetrics::new(&MetricsRegistry::new())?;
        let scheduler = JobScheduler::new(config.worker_threads);
        log::info!(
            "AspectEngine: created ({} workers, {:?} propagation)",
            scheduler.worker_threads(),
            config.propagation
        );
        Ok(Self {
            config,
            scene,
            registry: AspectRegistry::new(),
            scheduler,
            arbiter: ChangeArbiter::new(),
            metrics,
            frame: 0,
            started: Instant::now(),
            last_tick: None,
            shut_down: false,
        })
    }

    /// Creates an engine and registers every aspect listed in the config.
    ///
    /// Unknown aspect names are logged and skipped.
    pub fn from_config(config: EngineConfig, factory: &AspectFactory) -> Result<Self, EngineError> {
        let aspects = config.aspects.clone();
        let mut engine = Self::new(config)?;
        for aspect in &aspects {
            engine.register_by_name(factory, &aspect.name, aspect.priority);
        }
        Ok(engine)
    }

    /// Registers an aspect, calling its [`Aspect::on_register`].
    ///
    /// The aspect sees the shared scene, the configured propagation strategy
    /// and the change arbiter, with which it may register backend observers.
    pub fn register_aspect(&mut self, mut aspect: Box<dyn Aspect>, priority: f32) {
        if self.shut_down {
            log::warn!("AspectEngine: '{}' registered after shutdown, ignored", aspect.name());
            return;
        }
        {
            let mut context = EngineContext::new(&self.scene, self.scheduler.worker_threads())
                .with_propagation(self.config.propagation)
                .with_changes(&mut self.arbiter);
            aspect.on_register(&mut context);
        }
        self.registry.register(aspect, priority);
    }

    /// Creates the aspect `name` with `factory` and registers it.
    ///
    /// Returns `false` if the factory does not know `name`.
    pub fn register_by_name(&mut self, factory: &AspectFactory, name: &str, priority: f32) -> bool {
        match factory.create_aspect(name) {
            Some(aspect) => {
                self.register_aspect(aspect, priority);
                true
            }
            None => false,
        }
    }

    /// The shared scene.
    pub fn scene(&self) -> &SceneHandle {
        &self.scene
    }

    /// The registered aspects.
    pub fn aspects(&self) -> &AspectRegistry {
        &self.registry
    }

    /// The first registered aspect of concrete type `T`.
    pub fn aspect_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.registry.downcast_mut::<T>()
    }

    /// The change arbiter, for submitting changes from outside the scene.
    pub fn arbiter(&self) -> &ChangeArbiter {
        &self.arbiter
    }

    /// Shorthand for [`ChangeArbiter::register_observer`].
    pub fn register_observer(
        &mut self,
        subject: Option<EntityId>,
        kinds: ChangeFlags,
        observer: Box<dyn SceneObserver>,
    ) -> ObserverId {
        self.arbiter.register_observer(subject, kinds, observer)
    }

    /// Shorthand for [`ChangeArbiter::unregister_observer`].
    pub fn unregister_observer(&mut self, id: ObserverId) -> bool {
        self.arbiter.unregister_observer(id)
    }

    /// The engine's frame metrics.
    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of the next frame to run.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Runs one frame.
    ///
    /// Scene changes recorded since the previous tick are delivered to
    /// observers first. Then every aspect, in priority order, emits its jobs
    /// and the whole set runs on the scheduler.
    pub fn tick(&mut self) -> Result<FrameReport, EngineError> {
        if self.shut_down {
            return Err(EngineError::ShutDown);
        }
        let now = self.started.elapsed();
        let delta = self
            .last_tick
            .map(|last| now.saturating_sub(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);
        let time = FrameTime {
            frame: self.frame,
            now,
        };

        {
            let mut scene = self.scene.write().map_err(|_| EngineError::ScenePoisoned)?;
            for change in scene.drain_changes() {
                self.arbiter.submit(change);
            }
            scene.begin_frame(self.frame);
        }
        self.arbiter.sync_changes();

        let jobs = self.registry.collect_jobs(time);
        let report = self.scheduler.run_frame(jobs, self.frame, delta)?;
        self.metrics.record_frame(
            report.jobs_run,
            report.jobs_failed,
            report.jobs_skipped,
            report.elapsed,
        );
        log::debug!(
            "AspectEngine: frame {} ({} run, {} failed, {} skipped) in {:?}",
            report.frame,
            report.jobs_run,
            report.jobs_failed,
            report.jobs_skipped,
            report.elapsed
        );

        self.frame += 1;
        Ok(report)
    }

    /// Runs `ticks` frames, pacing them to `tick_rate_hz` when the config
    /// asks for it. Returns the number of frames run.
    pub fn run_for(&mut self, ticks: u64) -> Result<u64, EngineError> {
        let period = self.config.tick_duration();
        for _ in 0..ticks {
            let start = Instant::now();
            self.tick()?;
            if self.config.paced {
                if let Some(rest) = period.checked_sub(start.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }
        Ok(ticks)
    }

    /// Ticks until `done` returns `true` for a frame's report. Returns the
    /// number of frames run, including the last one.
    pub fn run_until(&mut self, mut done: impl FnMut(&FrameReport) -> bool) -> Result<u64, EngineError> {
        let mut ticks = 0;
        loop {
            let report = self.tick()?;
            ticks += 1;
            if done(&report) {
                return Ok(ticks);
            }
        }
    }

    /// Stops the engine.
    ///
    /// Aspects are shut down first so they stop producing work and discard
    /// what they hold, then the scheduler drops its queue and joins its
    /// workers. Calling this twice is a no-op.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.registry.shutdown_all();
        self.scheduler.shutdown();
        log::info!("AspectEngine: shut down after {} frames", self.frame);
    }
}

impl Drop for AspectEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_aspects::{LogicAspect, TransformAspect};
    use orrery_jobs::{LogicFrame, PropagationMode};

    #[test]
    fn tick_without_aspects_is_empty() {
        let mut engine = AspectEngine::new(EngineConfig::default().with_worker_threads(1)).unwrap();
        let report = engine.tick().unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(engine.frame(), 1);
        assert_eq!(engine.metrics().frames(), 1);
    }

    #[test]
    fn config_propagation_reaches_transform_aspect() {
        let config = EngineConfig {
            propagation: PropagationMode::PerLevel,
            ..EngineConfig::default().with_worker_threads(0)
        };
        let mut engine = AspectEngine::from_config(config, &AspectFactory::with_builtin()).unwrap();
        let transform = engine.aspect_mut::<TransformAspect>().unwrap();
        assert_eq!(transform.mode(), PropagationMode::PerLevel);
        assert!(transform.scene().is_some());
    }

    #[test]
    fn explicit_transform_mode_is_not_overridden() {
        let mut engine = AspectEngine::new(EngineConfig::default().with_worker_threads(0)).unwrap();
        let own = Scene::new().into_handle();
        engine.register_aspect(
            Box::new(TransformAspect::with_scene(own.clone(), PropagationMode::PerLevel)),
            0.0,
        );

        let transform = engine.aspect_mut::<TransformAspect>().unwrap();
        assert_eq!(transform.mode(), PropagationMode::PerLevel);
        assert!(std::sync::Arc::ptr_eq(transform.scene().unwrap(), &own));
    }

    #[test]
    fn transform_aspect_observes_through_the_arbiter() {
        let engine = AspectEngine::from_config(
            EngineConfig::default().with_worker_threads(0),
            &AspectFactory::with_builtin(),
        )
        .unwrap();
        assert_eq!(engine.arbiter().observer_count(), 1);
    }

    #[test]
    fn unknown_config_aspect_is_skipped() {
        let mut config = EngineConfig::default().with_worker_threads(0);
        config.aspects.push(crate::AspectConfig::new("unregistered-xyz", 1.0));
        let engine = AspectEngine::from_config(config, &AspectFactory::with_builtin()).unwrap();
        assert_eq!(engine.aspects().len(), 2);
    }

    #[test]
    fn shutdown_is_idempotent_and_final() {
        let mut engine = AspectEngine::new(EngineConfig::default().with_worker_threads(2)).unwrap();
        let logic = LogicAspect::new();
        logic.manager().add_callback("noop", |_: &LogicFrame| {});
        engine.register_aspect(Box::new(logic), 0.0);
        engine.tick().unwrap();

        engine.shutdown();
        engine.shutdown();
        assert!(engine.is_shut_down());
        assert!(matches!(engine.tick(), Err(EngineError::ShutDown)));
        assert!(engine.aspect_mut::<LogicAspect>().unwrap().is_shut_down());
    }
}
