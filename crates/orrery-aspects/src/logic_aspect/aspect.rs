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
use std::sync::Arc;
use std::time::Duration;

use orrery_core::aspect::{Aspect, AspectKind, FrameTime};
use orrery_core::job::{CancellationToken, JobHandle};
use orrery_jobs::{CallbackJob, LogicManager};

/// Runs the callbacks of its [`LogicManager`] once per tick.
///
/// Each tick it measures the time elapsed since the previous tick (zero on
/// the first one), hands it to the manager and emits a single callback job.
pub struct LogicAspect {
    manager: Arc<LogicManager>,
    token: CancellationToken,
    last_tick: Option<Duration>,
    job: JobHandle,
}

impl LogicAspect {
    /// Creates the aspect with an empty callback manager.
    pub fn new() -> Self {
        Self::with_manager(Arc::new(LogicManager::new()))
    }

    /// Creates the aspect around an existing manager.
    pub fn with_manager(manager: Arc<LogicManager>) -> Self {
        let token = CancellationToken::new();
        let job = JobHandle::new(CallbackJob::new(manager.clone(), token.clone()));
        Self {
            manager,
            token,
            last_tick: None,
            job,
        }
    }

    /// The callback manager; register callbacks here.
    pub fn manager(&self) -> &Arc<LogicManager> {
        &self.manager
    }

    /// Whether [`Aspect::on_shutdown`] has run.
    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for LogicAspect {
    fn default() -> Self {
        Self::new()
    }
}

impl Aspect for LogicAspect {
    fn kind(&self) -> AspectKind {
        AspectKind::Logic
    }

    fn jobs_to_execute(&mut self, time: FrameTime) -> Vec<JobHandle> {
        let delta = self
            .last_tick
            .map(|last| time.now.saturating_sub(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(time.now);
        self.manager.set_delta_time(time.frame, delta);
        vec![self.job.clone()]
    }

    fn on_shutdown(&mut self) {
        self.token.cancel();
        self.manager.clear();
        log::info!("LogicAspect: shut down");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
