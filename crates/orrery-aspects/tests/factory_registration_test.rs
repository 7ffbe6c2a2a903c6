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

use std::any::{Any, TypeId};

use orrery_aspects::{AspectFactory, AspectRegistration, LogicAspect};
use orrery_core::aspect::{Aspect, AspectKind, FrameTime};
use orrery_core::job::JobHandle;

/// A logic aspect that never emits work.
#[derive(Default)]
struct IdleAspect;

impl Aspect for IdleAspect {
    fn kind(&self) -> AspectKind {
        AspectKind::Logic
    }

    fn name(&self) -> &'static str {
        "idle"
    }

    fn jobs_to_execute(&mut self, _time: FrameTime) -> Vec<JobHandle> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

inventory::submit! {
    AspectRegistration {
        name: "idle",
        kind: AspectKind::Logic,
        type_id: TypeId::of::<IdleAspect>,
        create: || Box::new(IdleAspect),
    }
}

#[test]
fn submitted_aspects_are_visible_to_registered_factory() {
    let factory = AspectFactory::with_registered();
    assert_eq!(factory.names(), vec!["idle", "logic", "transform"]);

    let idle = factory.create_aspect("idle").unwrap();
    assert_eq!(idle.name(), "idle");
    assert_eq!(factory.aspect_name(idle.as_ref()), Some("idle"));
}

#[test]
fn builtin_factory_ignores_submissions() {
    let factory = AspectFactory::with_builtin();
    assert!(factory.create_aspect("idle").is_none());
}

#[test]
fn reverse_lookup_downcasts_by_concrete_type() {
    let factory = AspectFactory::with_registered();
    let mut logic = factory.create_aspect("logic").unwrap();
    assert!(logic.as_any_mut().downcast_mut::<LogicAspect>().is_some());
    assert_eq!(factory.aspect_name(logic.as_ref()), Some("logic"));
}
