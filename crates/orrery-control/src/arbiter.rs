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

//! Routes scene changes to interested observers.
//!
//! Changes may be submitted from any thread through [`ChangeArbiter::sender`];
//! they are queued and only delivered when the engine calls
//! [`ChangeArbiter::sync_changes`], once per tick.

use flume::{Receiver, Sender};
use orrery_core::change::{ChangeFlags, ChangeSender, ObserverRegistry, SceneChange, SceneObserver};
use orrery_core::ecs::EntityId;

pub use orrery_core::change::ObserverId;

struct ObserverEntry {
    id: ObserverId,
    subject: Option<EntityId>,
    kinds: ChangeFlags,
    observer: Box<dyn SceneObserver>,
}

impl ObserverEntry {
    fn wants(&self, change: &SceneChange) -> bool {
        self.kinds.contains(change.kind) && self.subject.map_or(true, |s| s == change.subject)
    }
}

/// Queue of pending scene changes plus the observers they are delivered to.
pub struct ChangeArbiter {
    sender: Sender<SceneChange>,
    receiver: Receiver<SceneChange>,
    observers: Vec<ObserverEntry>,
    next_id: u64,
}

impl ChangeArbiter {
    /// Creates an arbiter with an empty queue and no observers.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            observers: Vec::new(),
            next_id: 0,
        }
    }

    /// A sender feeding the queue; cloneable and usable from any thread.
    pub fn sender(&self) -> Sender<SceneChange> {
        self.sender.clone()
    }

    /// Queues a single change.
    pub fn submit(&self, change: SceneChange) {
        // The arbiter owns a receiver, so the channel cannot be disconnected.
        let _ = self.sender.send(change);
    }

    /// Registers `observer` for changes of `kinds`.
    ///
    /// With a `subject`, only changes to that entity are delivered; `None`
    /// observes the whole scene.
    pub fn register_observer(
        &mut self,
        subject: Option<EntityId>,
        kinds: ChangeFlags,
        observer: Box<dyn SceneObserver>,
    ) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId::from_raw(self.next_id);
        log::debug!(
            "ChangeArbiter: registered {} (subject={:?}, kinds={:#07b})",
            id,
            subject,
            kinds.bits()
        );
        self.observers.push(ObserverEntry {
            id,
            subject,
            kinds,
            observer,
        });
        id
    }

    /// Removes an observer. Returns `false` if `id` was not registered.
    pub fn unregister_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        self.observers.len() != before
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Changes queued but not yet delivered.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Delivers every change queued so far, in submission order, to the
    /// observers matching its subject and kind. Returns the number of
    /// deliveries.
    pub fn sync_changes(&mut self) -> usize {
        // Changes posted by observers while delivering wait for the next sync.
        let batch: Vec<SceneChange> = self.receiver.try_iter().collect();
        let mut delivered = 0;
        for change in batch {
            for entry in self.observers.iter_mut().filter(|o| o.wants(&change)) {
                entry.observer.scene_change(&change);
                delivered += 1;
            }
        }
        if delivered > 0 {
            log::trace!("ChangeArbiter: {} deliveries", delivered);
        }
        delivered
    }
}

impl ObserverRegistry for ChangeArbiter {
    fn register_observer(
        &mut self,
        subject: Option<EntityId>,
        kinds: ChangeFlags,
        observer: Box<dyn SceneObserver>,
    ) -> ObserverId {
        ChangeArbiter::register_observer(self, subject, kinds, observer)
    }

    fn unregister_observer(&mut self, id: ObserverId) -> bool {
        ChangeArbiter::unregister_observer(self, id)
    }

    fn change_sender(&self) -> ChangeSender {
        self.sender()
    }
}

impl Default for ChangeArbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::change::ChangeKind;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<SceneChange>>>);

    impl SceneObserver for Collect {
        fn scene_change(&mut self, change: &SceneChange) {
            self.0.lock().unwrap().push(change.clone());
        }
    }

    fn change(kind: ChangeKind, index: u32) -> SceneChange {
        SceneChange::new(kind, EntityId::new(index, 0), "transform", 0)
    }

    #[test]
    fn observers_only_see_their_subject_and_kinds() {
        let mut arbiter = ChangeArbiter::new();
        let all = Collect::default();
        let only_one = Collect::default();
        let only_created = Collect::default();

        arbiter.register_observer(None, ChangeFlags::ALL, Box::new(all.clone()));
        arbiter.register_observer(
            Some(EntityId::new(1, 0)),
            ChangeFlags::ALL,
            Box::new(only_one.clone()),
        );
        arbiter.register_observer(None, ChangeKind::NodeCreated.into(), Box::new(only_created.clone()));

        arbiter.submit(change(ChangeKind::NodeCreated, 1));
        arbiter.submit(change(ChangeKind::NodeUpdated, 2));
        arbiter.submit(change(ChangeKind::NodeCreated, 2));
        assert_eq!(arbiter.pending(), 3);

        assert_eq!(arbiter.sync_changes(), 3 + 1 + 2);
        assert_eq!(arbiter.pending(), 0);

        let all = all.0.lock().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].kind, ChangeKind::NodeUpdated);
        assert_eq!(only_one.0.lock().unwrap().len(), 1);
        assert!(only_created
            .0
            .lock()
            .unwrap()
            .iter()
            .all(|c| c.kind == ChangeKind::NodeCreated));
    }

    #[test]
    fn changes_from_other_threads_wait_for_sync() {
        let mut arbiter = ChangeArbiter::new();
        let seen = Collect::default();
        arbiter.register_observer(None, ChangeFlags::ALL, Box::new(seen.clone()));

        let sender = arbiter.sender();
        std::thread::spawn(move || {
            for i in 0..10 {
                sender.send(change(ChangeKind::NodeUpdated, i)).unwrap();
            }
        })
        .join()
        .unwrap();

        assert!(seen.0.lock().unwrap().is_empty());
        assert_eq!(arbiter.sync_changes(), 10);
        let order: Vec<u32> = seen.0.lock().unwrap().iter().map(|c| c.subject.index).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    /// Backend node that answers every change with a "reply" posted from a
    /// worker thread.
    struct Replier {
        sender: ChangeSender,
        seen: Collect,
    }

    impl SceneObserver for Replier {
        fn scene_change(&mut self, change: &SceneChange) {
            self.seen.0.lock().unwrap().push(change.clone());
            if change.property == "reply" {
                return;
            }
            let sender = self.sender.clone();
            let reply = SceneChange::new(ChangeKind::NodeUpdated, change.subject, "reply", change.frame);
            std::thread::spawn(move || sender.send(reply).unwrap())
                .join()
                .unwrap();
        }
    }

    #[test]
    fn backend_replies_reach_frontend_on_next_sync() {
        let mut arbiter = ChangeArbiter::new();
        let node = EntityId::new(7, 0);
        let backend = Collect::default();
        let frontend = Collect::default();

        let registry: &mut dyn ObserverRegistry = &mut arbiter;
        let sender = registry.change_sender();
        registry.register_observer(
            Some(node),
            ChangeFlags::ALL,
            Box::new(Replier {
                sender,
                seen: backend.clone(),
            }),
        );
        registry.register_observer(None, ChangeFlags::NODE_UPDATED, Box::new(frontend.clone()));

        arbiter.submit(change(ChangeKind::NodeUpdated, 7));
        arbiter.sync_changes();
        assert_eq!(backend.0.lock().unwrap().len(), 1);
        // The reply is queued, not delivered within the same sync.
        assert_eq!(arbiter.pending(), 1);

        arbiter.sync_changes();
        assert_eq!(backend.0.lock().unwrap().len(), 2);
        let frontend = frontend.0.lock().unwrap();
        let last = frontend.last().unwrap();
        assert_eq!(last.property, "reply");
        assert_eq!(last.subject, node);
        assert_eq!(last.kind, ChangeKind::NodeUpdated);
    }

    #[test]
    fn unregistered_observer_stops_receiving() {
        let mut arbiter = ChangeArbiter::new();
        let seen = Collect::default();
        let id = arbiter.register_observer(None, ChangeFlags::ALL, Box::new(seen.clone()));
        assert!(arbiter.unregister_observer(id));
        assert!(!arbiter.unregister_observer(id));

        arbiter.submit(change(ChangeKind::NodeDeleted, 0));
        assert_eq!(arbiter.sync_changes(), 0);
        assert!(seen.0.lock().unwrap().is_empty());
    }
}
