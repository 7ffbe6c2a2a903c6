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

//! Scene-change notifications.
//!
//! Scene mutations produce [`SceneChange`] records that the engine's change
//! arbiter forwards to registered [`SceneObserver`]s once per tick.
//! Aspects register their backend observers through an [`ObserverRegistry`]
//! and post replies from worker threads with a [`ChangeSender`].

use std::fmt;

use crate::ecs::EntityId;

/// The kind of a single scene change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// An entity was spawned.
    NodeCreated,
    /// An entity was despawned.
    NodeDeleted,
    /// A property of an entity changed.
    NodeUpdated,
    /// A component was attached to an entity.
    ComponentAdded,
    /// A component was detached from an entity.
    ComponentRemoved,
}

/// A set of [`ChangeKind`]s an observer is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeFlags {
    bits: u8,
}

impl ChangeFlags {
    /// No change kinds.
    pub const NONE: Self = Self { bits: 0 };
    /// [`ChangeKind::NodeCreated`].
    pub const NODE_CREATED: Self = Self { bits: 1 << 0 };
    /// [`ChangeKind::NodeDeleted`].
    pub const NODE_DELETED: Self = Self { bits: 1 << 1 };
    /// [`ChangeKind::NodeUpdated`].
    pub const NODE_UPDATED: Self = Self { bits: 1 << 2 };
    /// [`ChangeKind::ComponentAdded`].
    pub const COMPONENT_ADDED: Self = Self { bits: 1 << 3 };
    /// [`ChangeKind::ComponentRemoved`].
    pub const COMPONENT_REMOVED: Self = Self { bits: 1 << 4 };
    /// Every change kind.
    pub const ALL: Self = Self { bits: 0b1_1111 };

    /// Flags for a single kind.
    pub const fn from_kind(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::NodeCreated => Self::NODE_CREATED,
            ChangeKind::NodeDeleted => Self::NODE_DELETED,
            ChangeKind::NodeUpdated => Self::NODE_UPDATED,
            ChangeKind::ComponentAdded => Self::COMPONENT_ADDED,
            ChangeKind::ComponentRemoved => Self::COMPONENT_REMOVED,
        }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// Whether `kind` is part of this set.
    pub const fn contains(&self, kind: ChangeKind) -> bool {
        self.bits & Self::from_kind(kind).bits != 0
    }

    /// Union of two sets.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }
}

impl std::ops::BitOr for ChangeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl From<ChangeKind> for ChangeFlags {
    fn from(kind: ChangeKind) -> Self {
        Self::from_kind(kind)
    }
}

/// One recorded scene mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneChange {
    /// What happened.
    pub kind: ChangeKind,
    /// The entity the change applies to.
    pub subject: EntityId,
    /// The property or component that changed (e.g. `"transform"`).
    pub property: String,
    /// The frame during which the change was recorded.
    pub frame: u64,
}

impl SceneChange {
    /// Creates a change record.
    pub fn new(kind: ChangeKind, subject: EntityId, property: impl Into<String>, frame: u64) -> Self {
        Self {
            kind,
            subject,
            property: property.into(),
            frame,
        }
    }
}

impl fmt::Display for SceneChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}({}.{}) @frame {}",
            self.kind, self.subject, self.property, self.frame
        )
    }
}

/// Receives scene changes from the change arbiter.
pub trait SceneObserver: Send {
    /// Called once per delivered change, in submission order.
    fn scene_change(&mut self, change: &SceneChange);
}

/// Sending half of the change queue; cloneable and usable from any thread.
pub type ChangeSender = flume::Sender<SceneChange>;

/// Identifies a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Wraps a raw id handed out by an [`ObserverRegistry`].
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Something observers can be attached to, and changes posted into.
pub trait ObserverRegistry {
    /// Registers `observer` for changes of `kinds`, restricted to `subject`
    /// when one is given.
    fn register_observer(
        &mut self,
        subject: Option<EntityId>,
        kinds: ChangeFlags,
        observer: Box<dyn SceneObserver>,
    ) -> ObserverId;

    /// Removes an observer. Returns `false` if `id` was not registered.
    fn unregister_observer(&mut self, id: ObserverId) -> bool;

    /// A sender posting changes for delivery at the next sync.
    fn change_sender(&self) -> ChangeSender;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_contain_their_kinds() {
        let flags = ChangeFlags::NODE_CREATED | ChangeFlags::NODE_DELETED;
        assert!(flags.contains(ChangeKind::NodeCreated));
        assert!(flags.contains(ChangeKind::NodeDeleted));
        assert!(!flags.contains(ChangeKind::NodeUpdated));
        assert!(!ChangeFlags::NONE.contains(ChangeKind::ComponentAdded));
    }

    #[test]
    fn all_contains_every_kind() {
        for kind in [
            ChangeKind::NodeCreated,
            ChangeKind::NodeDeleted,
            ChangeKind::NodeUpdated,
            ChangeKind::ComponentAdded,
            ChangeKind::ComponentRemoved,
        ] {
            assert!(ChangeFlags::ALL.contains(kind));
            assert_eq!(ChangeFlags::from(kind).bits().count_ones(), 1);
        }
    }
}
