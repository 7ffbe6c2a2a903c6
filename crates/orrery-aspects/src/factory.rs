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

//! Name-based aspect creation.
//!
//! Other crates can contribute aspects without touching the factory:
//!
//! ```rust,ignore
//! inventory::submit! {
//!     orrery_aspects::AspectRegistration {
//!         name: "my-logic",
//!         kind: AspectKind::Logic,
//!         type_id: std::any::TypeId::of::<MyAspect>,
//!         create: || Box::new(MyAspect::default()),
//!     }
//! }
//! ```
//!
//! and are then visible through [`AspectFactory::with_registered`].

use std::any::TypeId;
use std::collections::BTreeMap;

use orrery_core::aspect::{Aspect, AspectKind};

use crate::{LogicAspect, TransformAspect};

/// Constructor stored by the factory.
pub type CreateAspectFn = fn() -> Box<dyn Aspect>;

/// A link-time aspect registration, collected with `inventory`.
pub struct AspectRegistration {
    /// The configuration name.
    pub name: &'static str,
    /// The kind of aspect created.
    pub kind: AspectKind,
    /// Returns the `TypeId` of the concrete aspect type.
    pub type_id: fn() -> TypeId,
    /// Creates a fresh instance.
    pub create: CreateAspectFn,
}

inventory::collect!(AspectRegistration);

struct AspectEntry {
    kind: AspectKind,
    type_id: TypeId,
    create: CreateAspectFn,
}

/// Maps configuration names to aspect constructors.
#[derive(Default)]
pub struct AspectFactory {
    entries: BTreeMap<String, AspectEntry>,
}

impl AspectFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory knowing the built-in `"logic"` and `"transform"` aspects.
    pub fn with_builtin() -> Self {
        let mut factory = Self::new();
        factory.register(
            AspectKind::Logic.as_str(),
            AspectKind::Logic,
            TypeId::of::<LogicAspect>(),
            || Box::new(LogicAspect::new()),
        );
        factory.register(
            AspectKind::Transform.as_str(),
            AspectKind::Transform,
            TypeId::of::<TransformAspect>(),
            || Box::new(TransformAspect::new()),
        );
        factory
    }

    /// The built-in aspects plus every [`AspectRegistration`] submitted
    /// anywhere in the final binary.
    pub fn with_registered() -> Self {
        let mut factory = Self::with_builtin();
        for registration in inventory::iter::<AspectRegistration> {
            factory.register(
                registration.name,
                registration.kind,
                (registration.type_id)(),
                registration.create,
            );
        }
        factory
    }

    /// Registers `create` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: AspectKind,
        type_id: TypeId,
        create: CreateAspectFn,
    ) {
        let name = name.into();
        log::debug!("AspectFactory: registered '{}' ({})", name, kind);
        let previous = self.entries.insert(
            name.clone(),
            AspectEntry {
                kind,
                type_id,
                create,
            },
        );
        if previous.is_some() {
            log::warn!("AspectFactory: '{}' was already registered, replaced", name);
        }
    }

    /// Creates the aspect registered under `name`.
    ///
    /// An unknown name is not fatal: it is logged and `None` is returned.
    pub fn create_aspect(&self, name: &str) -> Option<Box<dyn Aspect>> {
        match self.entries.get(name) {
            Some(entry) => Some((entry.create)()),
            None => {
                log::warn!("unsupported aspect {name}");
                None
            }
        }
    }

    /// The kind of the aspect registered under `name`.
    pub fn kind_of(&self, name: &str) -> Option<AspectKind> {
        self.entries.get(name).map(|e| e.kind)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The name `aspect`'s concrete type was registered under.
    pub fn aspect_name(&self, aspect: &dyn Aspect) -> Option<&str> {
        let type_id = aspect.as_any().type_id();
        self.entries
            .iter()
            .find(|(_, entry)| entry.type_id == type_id)
            .map(|(name, _)| name.as_str())
    }

    /// Every registered name, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
