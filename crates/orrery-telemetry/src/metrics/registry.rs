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

//! Registry for managing metrics.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{MetricId, MetricValue, MetricsError, MetricsResult};

type Storage = RwLock<HashMap<MetricId, MetricValue>>;

/// In-memory metrics store.
///
/// Registration hands out typed handles sharing the store, so hot paths
/// update a metric without looking it up by name.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    storage: Arc<Storage>,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, id: MetricId, initial: MetricValue) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::Storage("failed to acquire write lock".to_string()))?;
        match storage.get(&id) {
            Some(existing) if std::mem::discriminant(existing) != std::mem::discriminant(&initial) => {
                Err(MetricsError::TypeMismatch(id))
            }
            Some(_) => Ok(()),
            None => {
                storage.insert(id, initial);
                Ok(())
            }
        }
    }

    /// Registers a counter starting at zero. Registering an existing
    /// counter returns a handle to it.
    pub fn register_counter(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = MetricId::new(namespace, name);
        self.register(id.clone(), MetricValue::Counter(0))?;
        Ok(CounterHandle {
            id,
            storage: self.storage.clone(),
        })
    }

    /// Registers a gauge starting at zero.
    pub fn register_gauge(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        let id = MetricId::new(namespace, name);
        self.register(id.clone(), MetricValue::Gauge(0.0))?;
        Ok(GaugeHandle {
            id,
            storage: self.storage.clone(),
        })
    }

    /// The current value of `id`.
    pub fn get(&self, id: &MetricId) -> MetricsResult<MetricValue> {
        let storage = self
            .storage
            .read()
            .map_err(|_| MetricsError::Storage("failed to acquire read lock".to_string()))?;
        storage
            .get(id)
            .copied()
            .ok_or_else(|| MetricsError::NotFound(id.clone()))
    }

    /// Every metric of `namespace`, sorted by id.
    pub fn namespace(&self, namespace: &str) -> Vec<(MetricId, MetricValue)> {
        let Ok(storage) = self.storage.read() else {
            return Vec::new();
        };
        let mut metrics: Vec<_> = storage
            .iter()
            .filter(|(id, _)| id.namespace == namespace)
            .map(|(id, value)| (id.clone(), *value))
            .collect();
        metrics.sort_by(|a, b| a.0.cmp(&b.0));
        metrics
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether no metric is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn update(storage: &Storage, id: &MetricId, f: impl FnOnce(&mut MetricValue) -> bool) -> MetricsResult<()> {
    let mut storage = storage
        .write()
        .map_err(|_| MetricsError::Storage("failed to acquire write lock".to_string()))?;
    let value = storage
        .get_mut(id)
        .ok_or_else(|| MetricsError::NotFound(id.clone()))?;
    if f(value) {
        Ok(())
    } else {
        Err(MetricsError::TypeMismatch(id.clone()))
    }
}

/// Handle to a registered counter.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    storage: Arc<Storage>,
}

impl CounterHandle {
    /// The counter's id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }

    /// Adds one.
    pub fn increment(&self) -> MetricsResult<()> {
        self.increment_by(1)
    }

    /// Adds `delta`.
    pub fn increment_by(&self, delta: u64) -> MetricsResult<()> {
        update(&self.storage, &self.id, |value| match value {
            MetricValue::Counter(v) => {
                *v = v.saturating_add(delta);
                true
            }
            MetricValue::Gauge(_) => false,
        })
    }

    /// The current count.
    pub fn get(&self) -> u64 {
        match self.storage.read().ok().and_then(|s| s.get(&self.id).copied()) {
            Some(MetricValue::Counter(v)) => v,
            _ => 0,
        }
    }
}

/// Handle to a registered gauge.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    storage: Arc<Storage>,
}

impl GaugeHandle {
    /// The gauge's id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }

    /// Sets the gauge.
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        update(&self.storage, &self.id, |current| match current {
            MetricValue::Gauge(v) => {
                *v = value;
                true
            }
            MetricValue::Counter(_) => false,
        })
    }

    /// The last value set.
    pub fn get(&self) -> f64 {
        match self.storage.read().ok().and_then(|s| s.get(&self.id).copied()) {
            Some(MetricValue::Gauge(v)) => v,
            _ => 0.0,
        }
    }
}
