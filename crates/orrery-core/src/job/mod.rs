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

//! # Job Abstraction
//!
//! A **Job** is a unit of per-frame work produced by an aspect and executed
//! by the engine's scheduler, possibly on a worker thread.
//!
//! Jobs are wrapped in a [`JobHandle`], which gives them a stable identity
//! and carries their ordering constraints. A handle may depend on other
//! handles of the same frame; the scheduler never starts a job before all of
//! its in-frame dependencies have finished.
//!
//! ```rust,ignore
//! use orrery_core::job::{Job, JobContext, JobError, JobHandle};
//!
//! struct Hello;
//!
//! impl Job for Hello {
//!     fn name(&self) -> &str { "hello" }
//!     fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
//!         log::info!("frame {}", ctx.frame);
//!         Ok(())
//!     }
//! }
//!
//! let first = JobHandle::new(Hello);
//! let second = JobHandle::new(Hello).with_dependency(&first);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod cancellation;
pub use cancellation::CancellationToken;

/// Error type for job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The job could not complete its work.
    #[error("job '{job}' failed: {reason}")]
    Failed {
        /// Name of the failing job.
        job: String,
        /// Human-readable cause.
        reason: String,
    },
    /// The job observed a cancellation request and stopped.
    #[error("job cancelled")]
    Cancelled,
}

impl JobError {
    /// Convenience constructor for [`JobError::Failed`].
    pub fn failed(job: impl Into<String>, reason: impl fmt::Display) -> Self {
        JobError::Failed {
            job: job.into(),
            reason: reason.to_string(),
        }
    }
}

/// Per-frame data handed to every job of that frame.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// The engine frame this job belongs to.
    pub frame: u64,
    /// Time elapsed since the previous frame.
    pub delta: Duration,
    /// Set when the engine is shutting down.
    pub token: CancellationToken,
}

impl JobContext {
    /// Creates a context for `frame`.
    pub fn new(frame: u64, delta: Duration, token: CancellationToken) -> Self {
        Self {
            frame,
            delta,
            token,
        }
    }

    /// Shorthand for `self.token.is_cancelled()`.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A schedulable unit of work.
pub trait Job: Send + Sync {
    /// A short, human-readable name used in logs and reports.
    fn name(&self) -> &str;

    /// Performs the work.
    ///
    /// Long-running jobs should poll [`JobContext::is_cancelled`] and return
    /// early once it is set.
    fn run(&self, ctx: &JobContext) -> Result<(), JobError>;
}

/// An opaque, process-unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        JobId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// A job plus its identity and dependencies.
///
/// Cloning a handle keeps the same id, so an aspect may build its handles
/// once and return clones every frame.
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    job: Arc<dyn Job>,
    dependencies: Vec<JobId>,
}

impl JobHandle {
    /// Wraps a job in a new handle with a fresh id.
    pub fn new(job: impl Job + 'static) -> Self {
        Self::from_arc(Arc::new(job))
    }

    /// Wraps an already shared job.
    pub fn from_arc(job: Arc<dyn Job>) -> Self {
        Self {
            id: JobId::next(),
            job,
            dependencies: Vec::new(),
        }
    }

    /// The handle's id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// The wrapped job's name.
    pub fn name(&self) -> &str {
        self.job.name()
    }

    /// The wrapped job.
    pub fn job(&self) -> &Arc<dyn Job> {
        &self.job
    }

    /// Records that `other` must finish before this job starts.
    ///
    /// Dependencies on jobs that are not part of the same frame are ignored
    /// by the scheduler.
    pub fn add_dependency(&mut self, other: &JobHandle) {
        if other.id != self.id && !self.dependencies.contains(&other.id) {
            self.dependencies.push(other.id);
        }
    }

    /// Builder form of [`add_dependency`](Self::add_dependency).
    pub fn with_dependency(mut self, other: &JobHandle) -> Self {
        self.add_dependency(other);
        self
    }

    /// Removes every recorded dependency.
    pub fn clear_dependencies(&mut self) {
        self.dependencies.clear();
    }

    /// Ids this job waits for.
    pub fn dependencies(&self) -> &[JobId] {
        &self.dependencies
    }

    /// Runs the wrapped job.
    pub fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        self.job.run(ctx)
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("name", &self.job.name())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
