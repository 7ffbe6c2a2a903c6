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

//! User callbacks invoked once per frame.
//!
//! The [`LogicManager`] owns the callbacks; the logic aspect feeds it the
//! frame delta and emits a [`CallbackJob`] that triggers them on a worker.

use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use orrery_core::job::{CancellationToken, Job, JobContext, JobError};

/// Identifies a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback#{}", self.0)
    }
}

/// What a callback sees of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogicFrame {
    /// Frame number.
    pub frame: u64,
    /// Time since the previous tick; zero on the first tick.
    pub delta: Duration,
}

impl LogicFrame {
    /// The delta in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

type CallbackFn = Box<dyn FnMut(&LogicFrame) + Send>;

struct Callback {
    id: CallbackId,
    name: String,
    func: CallbackFn,
}

#[derive(Default)]
struct LogicState {
    callbacks: Vec<Callback>,
    next_id: u64,
    frame: u64,
    last_delta: Duration,
    // Ids taken out by running triggers, and the subset removed meanwhile.
    // Each trigger only settles its own ids, so triggers may overlap.
    in_flight: Vec<CallbackId>,
    removed: HashSet<CallbackId>,
}

/// Registry of per-frame callbacks.
///
/// The internal lock is never held while a callback runs, so callbacks may
/// add or remove callbacks (including themselves), and a concurrent
/// [`clear`](Self::clear) never waits for a running trigger. A callback that
/// panics is logged and removed; the others keep running.
#[derive(Default)]
pub struct LogicManager {
    state: Mutex<LogicState>,
}

impl LogicManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogicState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers `func`, called once per frame until removed.
    pub fn add_callback<F>(&self, name: impl Into<String>, func: F) -> CallbackId
    where
        F: FnMut(&LogicFrame) + Send + 'static,
    {
        let mut state = self.lock();
        state.next_id += 1;
        let id = CallbackId(state.next_id);
        let name = name.into();
        log::debug!("LogicManager: added {} ({})", id, name);
        state.callbacks.push(Callback {
            id,
            name,
            func: Box::new(func),
        });
        id
    }

    /// Removes a callback. Returns `false` if `id` is unknown.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let mut state = self.lock();
        if let Some(pos) = state.callbacks.iter().position(|c| c.id == id) {
            let callback = state.callbacks.remove(pos);
            log::debug!("LogicManager: removed {} ({})", id, callback.name);
            return true;
        }
        if state.in_flight.contains(&id) {
            return state.removed.insert(id);
        }
        false
    }

    /// Number of live callbacks, including those currently running.
    pub fn callback_count(&self) -> usize {
        let state = self.lock();
        state.callbacks.len() + state.in_flight.len() - state.removed.len()
    }

    /// Records the timing of the frame about to be triggered.
    pub fn set_delta_time(&self, frame: u64, delta: Duration) {
        let mut state = self.lock();
        state.frame = frame;
        state.last_delta = delta;
    }

    /// The delta recorded by the last [`set_delta_time`](Self::set_delta_time).
    pub fn last_delta(&self) -> Duration {
        self.lock().last_delta
    }

    /// Drops every callback without waiting for a running trigger.
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.callbacks.len();
        state.callbacks.clear();
        let in_flight = std::mem::take(&mut state.in_flight);
        state.removed.extend(in_flight.iter().copied());
        state.in_flight = in_flight;
        log::debug!("LogicManager: cleared {} pending callbacks", dropped);
    }

    /// Calls every callback once with the recorded frame timing.
    ///
    /// `cancelled` is polled before each callback; once it returns `true`
    /// the remaining callbacks are not called this frame. Returns the number
    /// of callbacks called, including any that panicked.
    pub fn trigger_callbacks(&self, cancelled: impl Fn() -> bool) -> usize {
        let (mut running, frame) = {
            let mut state = self.lock();
            let running = std::mem::take(&mut state.callbacks);
            state.in_flight.extend(running.iter().map(|c| c.id));
            (
                running,
                LogicFrame {
                    frame: state.frame,
                    delta: state.last_delta,
                },
            )
        };

        let mut called = 0;
        let mut panicked = HashSet::new();
        for callback in running.iter_mut() {
            if cancelled() {
                break;
            }
            let func = &mut callback.func;
            if panic::catch_unwind(AssertUnwindSafe(|| func(&frame))).is_err() {
                log::warn!(
                    "LogicManager: {} ({}) panicked in frame {}, removed",
                    callback.id,
                    callback.name,
                    frame.frame
                );
                panicked.insert(callback.id);
            }
            called += 1;
        }

        let mut state = self.lock();
        let taken: HashSet<CallbackId> = running.iter().map(|c| c.id).collect();
        state.in_flight.retain(|id| !taken.contains(id));
        running.retain(|c| !state.removed.contains(&c.id) && !panicked.contains(&c.id));
        state.removed.retain(|id| !taken.contains(id));
        // Callbacks added while running go after the existing ones.
        running.append(&mut state.callbacks);
        state.callbacks = running;
        called
    }
}

/// Triggers every callback of a [`LogicManager`].
pub struct CallbackJob {
    manager: Arc<LogicManager>,
    token: CancellationToken,
}

impl CallbackJob {
    /// The job's name as reported in logs.
    pub const NAME: &'static str = "callback";

    /// Creates the job. `token` is the owning aspect's own cancellation
    /// token, checked alongside the frame's.
    pub fn new(manager: Arc<LogicManager>, token: CancellationToken) -> Self {
        Self { manager, token }
    }
}

impl Job for CallbackJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        let cancelled = || ctx.is_cancelled() || self.token.is_cancelled();
        if cancelled() {
            return Err(JobError::Cancelled);
        }
        let called = self.manager.trigger_callbacks(&cancelled);
        log::trace!("{}: {} callbacks (frame {})", Self::NAME, called, ctx.frame);
        if cancelled() {
            return Err(JobError::Cancelled);
        }
        Ok(())
    }
}
