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

//! The worker pool executing each frame's job graph.
//!
//! A frame is a set of [`JobHandle`]s. The scheduler validates the graph,
//! then hands every job whose in-frame dependencies have completed to the
//! workers, and blocks until each job has either run or been skipped.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use orrery_core::graph::topological_sort;
use orrery_core::job::{CancellationToken, JobContext, JobError, JobHandle, JobId};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Errors rejecting a whole frame before any of its jobs runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The frame's dependency graph has a cycle.
    #[error("job dependency cycle in frame {frame}")]
    Cycle {
        /// The rejected frame.
        frame: u64,
    },
    /// The same job handle was submitted twice in one frame.
    #[error("{0} submitted twice in one frame")]
    DuplicateJob(JobId),
    /// The scheduler no longer accepts work.
    #[error("scheduler is shut down")]
    ShutDown,
}

/// What happened to the jobs of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// The frame number.
    pub frame: u64,
    /// Jobs that completed successfully.
    pub jobs_run: usize,
    /// Jobs that returned an error or panicked.
    pub jobs_failed: usize,
    /// Jobs not run: cancelled, dropped at shutdown, or depending on a job
    /// that did not complete.
    pub jobs_skipped: usize,
    /// Wall time spent in the frame.
    pub elapsed: Duration,
}

impl FrameReport {
    /// Number of jobs accounted for.
    pub fn total(&self) -> usize {
        self.jobs_run + self.jobs_failed + self.jobs_skipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Failed,
    Cancelled,
    Dropped,
}

/// Reports a task's outcome exactly once, even if the task is dropped
/// without running.
struct Completion {
    index: usize,
    done: Sender<(usize, Outcome)>,
    sent: bool,
}

impl Completion {
    fn finish(mut self, outcome: Outcome) {
        self.sent = true;
        let _ = self.done.send((self.index, outcome));
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.done.send((self.index, Outcome::Dropped));
        }
    }
}

fn execute(job: &JobHandle, ctx: &JobContext) -> Outcome {
    log::trace!("JobScheduler: running '{}' ({})", job.name(), job.id());
    match panic::catch_unwind(AssertUnwindSafe(|| job.run(ctx))) {
        Ok(Ok(())) => Outcome::Completed,
        Ok(Err(JobError::Cancelled)) => Outcome::Cancelled,
        Ok(Err(e)) => {
            log::warn!("JobScheduler: {} (frame {})", e, ctx.frame);
            Outcome::Failed
        }
        Err(_) => {
            log::warn!("JobScheduler: job '{}' panicked (frame {})", job.name(), ctx.frame);
            Outcome::Failed
        }
    }
}

/// Dependency bookkeeping for one frame.
struct FrameGraph {
    dependents: Vec<Vec<usize>>,
    waiting: Vec<usize>,
    skipped: Vec<bool>,
    report: FrameReport,
}

impl FrameGraph {
    fn build(jobs: &[JobHandle], frame: u64) -> Result<(Self, Vec<usize>), ScheduleError> {
        let mut index: HashMap<JobId, usize> = HashMap::with_capacity(jobs.len());
        for (i, job) in jobs.iter().enumerate() {
            if index.insert(job.id(), i).is_some() {
                return Err(ScheduleError::DuplicateJob(job.id()));
            }
        }

        let mut dependents = vec![Vec::new(); jobs.len()];
        let mut waiting = vec![0; jobs.len()];
        let mut edges = Vec::new();
        for (i, job) in jobs.iter().enumerate() {
            // Dependencies outside this frame are already satisfied.
            for dep in job.dependencies().iter().filter_map(|d| index.get(d)) {
                dependents[*dep].push(i);
                waiting[i] += 1;
                edges.push((*dep, i));
            }
        }

        let order = topological_sort(0..jobs.len(), edges).map_err(|_| ScheduleError::Cycle { frame })?;
        let graph = Self {
            dependents,
            waiting,
            skipped: vec![false; jobs.len()],
            report: FrameReport {
                frame,
                ..FrameReport::default()
            },
        };
        Ok((graph, order))
    }

    /// Records `outcome` for job `index` and returns the jobs it unblocked.
    fn settle(&mut self, index: usize, outcome: Outcome) -> Vec<usize> {
        match outcome {
            Outcome::Completed => {
                self.report.jobs_run += 1;
                let mut ready = Vec::new();
                for &d in &self.dependents[index] {
                    self.waiting[d] -= 1;
                    if self.waiting[d] == 0 && !self.skipped[d] {
                        ready.push(d);
                    }
                }
                ready
            }
            Outcome::Failed => {
                self.report.jobs_failed += 1;
                self.skip_dependents(index);
                Vec::new()
            }
            Outcome::Cancelled | Outcome::Dropped => {
                self.report.jobs_skipped += 1;
                self.skip_dependents(index);
                Vec::new()
            }
        }
    }

    fn skip_dependents(&mut self, index: usize) {
        let mut stack = self.dependents[index].clone();
        while let Some(d) = stack.pop() {
            if !self.skipped[d] {
                self.skipped[d] = true;
                self.report.jobs_skipped += 1;
                stack.extend(self.dependents[d].iter().copied());
            }
        }
    }
}

fn worker_loop(receiver: Receiver<Task>, token: CancellationToken) {
    log::debug!("{}: started", thread::current().name().unwrap_or("worker"));
    while let Ok(task) = receiver.recv() {
        if token.is_cancelled() {
            // Dropped unrun; its completion guard reports it.
            drop(task);
            continue;
        }
        task();
    }
    log::debug!("{}: stopped", thread::current().name().unwrap_or("worker"));
}

/// A fixed-size pool of worker threads running job graphs.
///
/// With zero workers, frames run inline on the calling thread in
/// topological order.
pub struct JobScheduler {
    sender: Option<Sender<Task>>,
    receiver: Receiver<Task>,
    workers: Vec<JoinHandle<()>>,
    token: CancellationToken,
    last_frame: AtomicU64,
}

impl JobScheduler {
    /// Spawns `worker_threads` workers named `orrery-worker-{i}`.
    pub fn new(worker_threads: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Task>();
        let token = CancellationToken::new();

        let mut workers = Vec::with_capacity(worker_threads);
        for i in 0..worker_threads {
            let rx = receiver.clone();
            let tk = token.clone();
            match thread::Builder::new()
                .name(format!("orrery-worker-{i}"))
                .spawn(move || worker_loop(rx, tk))
            {
                Ok(handle) => workers.push(handle),
                Err(e) => log::error!("JobScheduler: failed to spawn worker {}: {}", i, e),
            }
        }
        log::info!("JobScheduler: {} worker threads", workers.len());

        Self {
            sender: Some(sender),
            receiver,
            workers,
            token,
            last_frame: AtomicU64::new(0),
        }
    }

    /// Number of live worker threads; zero means inline execution.
    pub fn worker_threads(&self) -> usize {
        self.workers.len()
    }

    /// Tasks queued but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The token handed to every job context; set at shutdown.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn submit(&self, task: Task) {
        match &self.sender {
            // A failed send returns the task, which is then dropped and
            // reported through its completion guard.
            Some(sender) => {
                let _ = sender.send(task);
            }
            None => drop(task),
        }
    }

    /// Queues a single job outside any frame graph.
    ///
    /// The job runs with the number of the last scheduled frame. Returns
    /// [`ScheduleError::ShutDown`] once the scheduler stopped.
    pub fn spawn(&self, job: JobHandle) -> Result<(), ScheduleError> {
        if self.is_shut_down() {
            return Err(ScheduleError::ShutDown);
        }
        let ctx = JobContext::new(self.last_frame.load(Ordering::Relaxed), Duration::ZERO, self.token.clone());
        if self.workers.is_empty() {
            execute(&job, &ctx);
        } else {
            self.submit(Box::new(move || {
                execute(&job, &ctx);
            }));
        }
        Ok(())
    }

    /// Runs one frame's jobs and blocks until every one has run or been
    /// skipped.
    ///
    /// A cyclic or duplicated graph is rejected before any job starts. A job
    /// that fails makes its dependents (transitively) skipped; independent
    /// jobs still run.
    pub fn run_frame(&self, jobs: Vec<JobHandle>, frame: u64, delta: Duration) -> Result<FrameReport, ScheduleError> {
        if self.is_shut_down() {
            return Err(ScheduleError::ShutDown);
        }
        let start = Instant::now();
        self.last_frame.store(frame, Ordering::Relaxed);

        let (mut graph, order) = FrameGraph::build(&jobs, frame)?;
        let ctx = JobContext::new(frame, delta, self.token.clone());

        if self.workers.is_empty() {
            for index in order {
                if graph.skipped[index] {
                    continue;
                }
                let outcome = execute(&jobs[index], &ctx);
                graph.settle(index, outcome);
            }
        } else {
            let (done_tx, done_rx) = crossbeam_channel::unbounded();
            let dispatch = |index: usize| {
                let job = jobs[index].clone();
                let ctx = ctx.clone();
                let completion = Completion {
                    index,
                    done: done_tx.clone(),
                    sent: false,
                };
                self.submit(Box::new(move || {
                    let outcome = execute(&job, &ctx);
                    completion.finish(outcome);
                }));
            };

            for &index in order.iter().filter(|&&i| graph.waiting[i] == 0) {
                dispatch(index);
            }
            while graph.report.total() < jobs.len() {
                let Ok((index, outcome)) = done_rx.recv() else {
                    break;
                };
                for ready in graph.settle(index, outcome) {
                    dispatch(ready);
                }
            }
        }

        graph.report.elapsed = start.elapsed();
        log::trace!(
            "JobScheduler: frame {} done ({} run, {} failed, {} skipped)",
            frame,
            graph.report.jobs_run,
            graph.report.jobs_failed,
            graph.report.jobs_skipped
        );
        Ok(graph.report)
    }

    /// Stops the pool.
    ///
    /// Cancels the pool token, drops every queued task without running it
    /// and joins the workers. Running jobs observe the token and are
    /// expected to return early. Calling this twice is a no-op.
    pub fn shutdown(&mut self) {
        if self.sender.is_none() && self.workers.is_empty() {
            return;
        }
        self.token.cancel();

        let mut dropped = 0;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        self.sender = None;

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("JobScheduler: a worker thread panicked");
            }
        }
        log::info!("JobScheduler: shut down ({} queued tasks dropped)", dropped);
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
