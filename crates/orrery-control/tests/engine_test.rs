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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use orrery_aspects::{AspectFactory, LogicAspect, TransformAspect, WORLD_TRANSFORM_PROPERTY};
use orrery_control::{AspectEngine, EngineConfig};
use orrery_core::change::{ChangeFlags, ChangeKind, SceneChange, SceneObserver};
use orrery_core::math::{Vec3, EPSILON};
use orrery_data::{SceneDescription, Transform};
use orrery_jobs::{LogicFrame, PropagationMode};

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<SceneChange>>>);

impl SceneObserver for Collect {
    fn scene_change(&mut self, change: &SceneChange) {
        self.0.lock().unwrap().push(change.clone());
    }
}

const ARM: &str = r#"(
    nodes: [
        (
            name: Some("base"),
            children: [
                (
                    name: Some("elbow"),
                    transform: (translation: (x: 0.0, y: 2.0, z: 0.0)),
                    children: [
                        (
                            name: Some("hand"),
                            transform: (translation: (x: 0.0, y: 1.0, z: 0.0)),
                            bounds: Some((min: (x: -0.1, y: -0.1, z: -0.1), max: (x: 0.1, y: 0.1, z: 0.1))),
                        ),
                    ],
                ),
            ],
        ),
    ],
)"#;

fn engine_with_arm(workers: usize, propagation: PropagationMode) -> AspectEngine {
    let config = EngineConfig {
        propagation,
        ..EngineConfig::default().with_worker_threads(workers)
    };
    let engine = AspectEngine::from_config(config, &AspectFactory::with_builtin()).unwrap();
    let description = SceneDescription::from_ron_str(ARM).unwrap();
    engine.scene().write().unwrap().instantiate(&description).unwrap();
    engine
}

#[test]
fn callbacks_move_the_scene_and_transforms_follow() {
    // --- 1. ARRANGE ---
    let mut engine = engine_with_arm(3, PropagationMode::DepthFirst);
    let (base, hand) = {
        let scene = engine.scene().read().unwrap();
        (scene.find_by_name("base").unwrap(), scene.find_by_name("hand").unwrap())
    };

    let scene = engine.scene().clone();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    engine
        .aspect_mut::<LogicAspect>()
        .unwrap()
        .manager()
        .add_callback("slide-base", move |frame: &LogicFrame| {
            counter.fetch_add(1, Ordering::SeqCst);
            if frame.frame == 0 {
                let mut scene = scene.write().unwrap();
                scene
                    .set_transform(base, Transform::from_translation(Vec3::new(5.0, 0.0, 0.0)))
                    .unwrap();
            }
        });

    // Instantiation also updated the base (its name); start from a clean queue.
    engine.scene().write().unwrap().drain_changes();
    let moves = Collect::default();
    engine.register_observer(Some(base), ChangeKind::NodeUpdated.into(), Box::new(moves.clone()));

    // --- 2. ACT ---
    // Frame 0 moves the base; frame 1 delivers the change and propagates.
    engine.run_for(2).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let hand_pos = engine.scene().read().unwrap().world_transform(hand).unwrap().translation();
    assert!(hand_pos.approx_eq(Vec3::new(5.0, 3.0, 0.0), EPSILON), "{hand_pos:?}");

    let moves = moves.0.lock().unwrap();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].property, "transform");
    assert_eq!(moves[0].frame, 0);

    assert_eq!(engine.metrics().frames(), 2);
    // logic: 1 job, transform: 2 jobs, per frame; frame 1 also announces
    // the moved world transforms.
    assert_eq!(engine.metrics().jobs_run(), 7);
    assert_eq!(engine.metrics().jobs_failed(), 0);
}

#[test]
fn instantiation_changes_reach_scene_wide_observers() {
    let mut engine = engine_with_arm(1, PropagationMode::PerLevel);
    let created = Collect::default();
    engine.register_observer(None, ChangeFlags::NODE_CREATED, Box::new(created.clone()));

    engine.tick().unwrap();
    assert_eq!(created.0.lock().unwrap().len(), 3);

    engine.tick().unwrap();
    assert_eq!(created.0.lock().unwrap().len(), 3);
}

#[test]
fn moved_subtree_is_announced_to_frontend_observers() {
    // --- 1. ARRANGE ---
    let mut engine = engine_with_arm(2, PropagationMode::PerLevel);
    let (base, elbow, hand) = {
        let scene = engine.scene().read().unwrap();
        (
            scene.find_by_name("base").unwrap(),
            scene.find_by_name("elbow").unwrap(),
            scene.find_by_name("hand").unwrap(),
        )
    };
    let updates = Collect::default();
    engine.register_observer(None, ChangeFlags::NODE_UPDATED, Box::new(updates.clone()));
    engine.tick().unwrap();

    // --- 2. ACT ---
    engine
        .scene()
        .write()
        .unwrap()
        .set_transform(elbow, Transform::from_translation(Vec3::new(1.0, 2.0, 0.0)))
        .unwrap();
    // Frame 1 sees the edit and replies from a worker; frame 2 delivers it.
    engine.run_for(3).unwrap();

    // --- 3. ASSERT ---
    let updates = updates.0.lock().unwrap();
    let announced: Vec<&SceneChange> = updates
        .iter()
        .filter(|c| c.property == WORLD_TRANSFORM_PROPERTY)
        .collect();
    assert_eq!(announced.len(), 2, "{announced:?}");
    assert!(announced.iter().all(|c| c.frame == 1));
    let subjects: Vec<_> = announced.iter().map(|c| c.subject).collect();
    assert!(subjects.contains(&elbow) && subjects.contains(&hand));
    assert!(!subjects.contains(&base));
    assert_eq!(engine.aspect_mut::<TransformAspect>().unwrap().pending_notifications(), 0);
}

#[test]
fn inline_and_pooled_engines_agree() {
    let mut inline = engine_with_arm(0, PropagationMode::DepthFirst);
    let mut pooled = engine_with_arm(4, PropagationMode::PerLevel);
    inline.run_for(1).unwrap();
    pooled.run_for(1).unwrap();

    let a = inline.scene().read().unwrap();
    let b = pooled.scene().read().unwrap();
    for name in ["base", "elbow", "hand"] {
        let ia = a.find_by_name(name).unwrap();
        let ib = b.find_by_name(name).unwrap();
        assert!(a
            .world_transform(ia)
            .unwrap()
            .approx_eq(&b.world_transform(ib).unwrap(), EPSILON));
        assert_eq!(
            a.bounding_volume(ia).unwrap().expanded,
            b.bounding_volume(ib).unwrap().expanded
        );
    }
}

#[test]
fn run_until_stops_on_predicate() {
    let mut engine = engine_with_arm(2, PropagationMode::DepthFirst);
    let ticks = engine.run_until(|report| report.frame == 4).unwrap();
    assert_eq!(ticks, 5);
    assert_eq!(engine.frame(), 5);
}

#[test]
fn shutdown_with_pending_callbacks_does_not_block() {
    let mut engine = engine_with_arm(2, PropagationMode::DepthFirst);
    let manager = engine.aspect_mut::<LogicAspect>().unwrap().manager().clone();
    for i in 0..100 {
        manager.add_callback(format!("slow-{i}"), |_: &LogicFrame| {
            std::thread::sleep(Duration::from_secs(5));
        });
    }

    let start = Instant::now();
    engine.shutdown();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(manager.callback_count(), 0);
}
