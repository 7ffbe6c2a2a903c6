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

//! Per-frame engine counters.

use std::time::Duration;

use super::registry::{CounterHandle, GaugeHandle, MetricsRegistry};
use super::{MetricId, MetricValue, MetricsResult};

/// Namespace of every metric recorded by [`FrameMetrics`].
pub const ENGINE_NAMESPACE: &str = "engine";

/// The engine's frame counters, registered under [`ENGINE_NAMESPACE`].
#[derive(Debug, Clone)]
pub struct FrameMetrics {
    registry: MetricsRegistry,
    frames: CounterHandle,
    jobs_run: CounterHandle,
    jobs_failed: CounterHandle,
    jobs_skipped: CounterHandle,
    frame_time_ms: GaugeHandle,
}

impl FrameMetrics {
    /// Registers the frame metrics in `registry`.
    pub fn new(registry: &MetricsRegistry) -> MetricsResult<Self> {
        Ok(Self {
            registry: registry.clone(),
            frames: registry.register_counter(ENGINE_NAMESPACE, "frames")?,
            jobs_run: registry.register_counter(ENGINE_NAMESPACE, "jobs_run")?,
            jobs_failed: registry.register_counter(ENGINE_NAMESPACE, "jobs_failed")?,
            jobs_skipped: registry.register_counter(ENGINE_NAMESPACE, "jobs_skipped")?,
            frame_time_ms: registry.register_gauge(ENGINE_NAMESPACE, "frame_time_ms")?,
        })
    }

    /// Records one finished frame.
    pub fn record_frame(&self, run: usize, failed: usize, skipped: usize, elapsed: Duration) {
        let results = [
            self.frames.increment(),
            self.jobs_run.increment_by(run as u64),
            self.jobs_failed.increment_by(failed as u64),
            self.jobs_skipped.increment_by(skipped as u64),
            self.frame_time_ms.set(elapsed.as_secs_f64() * 1000.0),
        ];
        for result in results {
            if let Err(e) = result {
                log::warn!("FrameMetrics: failed to record metric: {}", e);
            }
        }
    }

    /// Frames recorded so far.
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    /// Jobs that completed successfully.
    pub fn jobs_run(&self) -> u64 {
        self.jobs_run.get()
    }

    /// Jobs that returned an error or panicked.
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.get()
    }

    /// Jobs skipped because a dependency did not complete, or cancelled.
    pub fn jobs_skipped(&self) -> u64 {
        self.jobs_skipped.get()
    }

    /// Duration of the last frame in milliseconds.
    pub fn last_frame_time_ms(&self) -> f64 {
        self.frame_time_ms.get()
    }

    /// Every engine metric, sorted by id.
    pub fn snapshot(&self) -> Vec<(MetricId, MetricValue)> {
        self.registry.namespace(ENGINE_NAMESPACE)
    }
}
