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

//! Metric identity, values and errors.

use std::fmt;

pub mod frame;
pub mod registry;

/// Uniquely identifies a metric as `namespace:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    /// The broad category of the metric (e.g., "engine").
    pub namespace: String,
    /// The specific name of the metric (e.g., "frame_time_ms").
    pub name: String,
}

impl MetricId {
    /// Creates a new `MetricId`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// The current value of a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Monotonically increasing count.
    Counter(u64),
    /// Last observed value.
    Gauge(f64),
}

impl MetricValue {
    /// The value as a float, whatever its kind.
    pub fn as_f64(&self) -> f64 {
        match *self {
            MetricValue::Counter(v) => v as f64,
            MetricValue::Gauge(v) => v,
        }
    }
}

/// Errors from the metrics registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    /// No metric with this id was registered.
    #[error("metric not found: {0}")]
    NotFound(MetricId),
    /// The metric exists with another kind.
    #[error("metric {0} has a different type")]
    TypeMismatch(MetricId),
    /// The storage lock was poisoned.
    #[error("metrics storage error: {0}")]
    Storage(String),
}

/// Result alias for metrics operations.
pub type MetricsResult<T> = Result<T, MetricsError>;
