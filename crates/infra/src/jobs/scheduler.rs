//! Async job scheduler: priority queue, bounded worker pool, retry timers.
//!
//! One dispatcher task owns dequeueing. It first takes a worker slot (a
//! semaphore permit), then pops the best job in the queue, so the job chosen is
//! the most urgent one at the moment a worker frees up. Each dequeued job runs on
//! its own task while holding the permit.
//!
//! Every job publishes its [`JobState`] on a `watch` channel. Waiters clone the
//! receiver from the [`JobHandle`]; several waiters may share one job.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use retone_core::{JobId, RequestKey, RewriteOutcome};

use super::queue::PriorityQueue;
use super::records::{COMPLETED_HISTORY, FAILED_HISTORY, JobRecord, JobRecords};
use super::types::{Job, JobError, JobState, Priority, RetryPolicy, RewriteJob};

/// Work performed for each dequeued job.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, job: &Job) -> Result<RewriteOutcome, JobError>;
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Name for logging
    pub name: String,
    /// Jobs allowed to run at once
    pub workers: usize,
    /// Jobs allowed to wait in the queue; retries are exempt
    pub max_queue_depth: usize,
    pub retry_policy: RetryPolicy,
    pub completed_history: usize,
    pub failed_history: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "rewrite-scheduler".to_string(),
            workers: 3,
            max_queue_depth: 1000,
            retry_policy: RetryPolicy::default(),
            completed_history: COMPLETED_HISTORY,
            failed_history: FAILED_HISTORY,
        }
    }
}

impl SchedulerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("job queue is full ({depth} jobs waiting)")]
    QueueFull { depth: usize },

    #[error("scheduler is shutting down")]
    ShuttingDown,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("job {job_id} did not finish within {waited:?}")]
    Timeout { job_id: JobId, waited: Duration },

    #[error("job {job_id} failed after {attempts} attempts: {error}")]
    Failed {
        job_id: JobId,
        attempts: u32,
        error: String,
    },

    #[error("job {job_id} was dropped before finishing")]
    Abandoned { job_id: JobId },
}

/// Caller's view of a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    key: RequestKey,
    priority: Priority,
    state: watch::Receiver<JobState>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn key(&self) -> &RequestKey {
        &self.key
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Current state snapshot.
    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    /// A fresh receiver for state changes.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// Terminal, or its scheduler is gone.
    pub fn is_finished(&self) -> bool {
        self.state.borrow().is_terminal() || self.state.has_changed().is_err()
    }

    /// Wait up to `timeout` for the job to finish.
    ///
    /// Timing out abandons the wait only; the job keeps running.
    pub async fn wait(&self, timeout: Duration) -> Result<RewriteOutcome, WaitError> {
        let mut state = self.state.clone();
        let finished = tokio::time::timeout(timeout, async move {
            state
                .wait_for(JobState::is_terminal)
                .await
                .map(|s| (*s).clone())
        })
        .await;

        match finished {
            Err(_) => Err(WaitError::Timeout {
                job_id: self.id,
                waited: timeout,
            }),
            Ok(Ok(JobState::Completed(outcome))) => Ok(outcome),
            Ok(Ok(JobState::Failed { attempts, error })) => Err(WaitError::Failed {
                job_id: self.id,
                attempts,
                error,
            }),
            Ok(_) => Err(WaitError::Abandoned { job_id: self.id }),
        }
    }
}

/// Scheduler runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub workers: usize,
    pub queued: usize,
    pub running: usize,
    /// Admitted jobs not yet terminal (queued, running or awaiting a retry)
    pub outstanding: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub rejected: u64,
    pub accepting: bool,
}

/// Result of [`Scheduler::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Every admitted job finished before the drain timeout.
    pub drained: bool,
    /// Queued jobs failed because they never started.
    pub abandoned: usize,
}

struct Queued {
    job: Job,
    notifier: watch::Sender<JobState>,
}

struct QueueState {
    jobs: PriorityQueue<Queued>,
    stopped: bool,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    rejected: AtomicU64,
    running: AtomicUsize,
}

struct Shared {
    config: SchedulerConfig,
    handler: Arc<dyn JobHandler>,
    queue: Mutex<QueueState>,
    wake: Notify,
    slots: Arc<Semaphore>,
    accepting: AtomicBool,
    outstanding: AtomicUsize,
    idle: Notify,
    records: Mutex<JobRecords>,
    counters: Counters,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    /// Put an admitted job back in the queue. Hands it back once stopped.
    fn enqueue(&self, queued: Queued) -> Result<(), Queued> {
        {
            let mut queue = lock(&self.queue);
            if queue.stopped {
                return Err(queued);
            }
            let priority = queued.job.priority;
            queue.jobs.push(priority, queued);
        }
        self.wake.notify_one();
        Ok(())
    }

    async fn next_job(&self) -> Option<Queued> {
        loop {
            let notified = self.wake.notified();
            {
                let mut queue = lock(&self.queue);
                if let Some(queued) = queue.jobs.pop() {
                    return Some(queued);
                }
                if queue.stopped {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Publish a terminal state and update the books.
    fn finish(&self, job: &Job, notifier: &watch::Sender<JobState>, state: JobState) {
        let record = JobRecord::from_job(job);
        {
            let mut records = lock(&self.records);
            if matches!(state, JobState::Completed(_)) {
                records.push_completed(record);
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
            } else {
                records.push_failed(record);
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        notifier.send_replace(state);

        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_one();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let idle = self.idle.notified();
            if self.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Priority scheduler with a bounded worker pool.
pub struct Scheduler {
    shared: Arc<Shared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Spawn the dispatcher on the current tokio runtime.
    pub fn start(config: SchedulerConfig, handler: Arc<dyn JobHandler>) -> Self {
        let workers = config.workers.max(1);
        let records = JobRecords::new(config.completed_history, config.failed_history);
        let shared = Arc::new(Shared {
            config,
            handler,
            queue: Mutex::new(QueueState {
                jobs: PriorityQueue::new(),
                stopped: false,
            }),
            wake: Notify::new(),
            slots: Arc::new(Semaphore::new(workers)),
            accepting: AtomicBool::new(true),
            outstanding: AtomicUsize::new(0),
            idle: Notify::new(),
            records: Mutex::new(records),
            counters: Counters::default(),
        });

        let dispatcher = tokio::spawn(dispatch_loop(shared.clone()));

        Self {
            shared,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Admit a job. Fails fast when the queue is full or shutdown has begun.
    pub fn submit(&self, payload: RewriteJob, priority: Priority) -> Result<JobHandle, SchedulerError> {
        let shared = &self.shared;
        if !shared.accepting.load(Ordering::SeqCst) {
            shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(SchedulerError::ShuttingDown);
        }

        let job = Job::new(payload, priority).with_retry_policy(shared.config.retry_policy.clone());
        let (notifier, state) = watch::channel(JobState::Pending);
        let handle = JobHandle {
            id: job.id,
            key: job.payload.key.clone(),
            priority,
            state,
        };

        {
            let mut queue = lock(&shared.queue);
            if queue.stopped {
                shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(SchedulerError::ShuttingDown);
            }
            let depth = queue.jobs.len();
            if depth >= shared.config.max_queue_depth {
                shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(scheduler = %shared.config.name, depth, key = %handle.key, "job queue full, rejecting");
                return Err(SchedulerError::QueueFull { depth });
            }
            shared.outstanding.fetch_add(1, Ordering::SeqCst);
            queue.jobs.push(priority, Queued { job, notifier });
        }

        shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        shared.wake.notify_one();
        debug!(
            scheduler = %shared.config.name,
            job_id = %handle.id,
            key = %handle.key,
            priority = %priority,
            "job submitted"
        );
        Ok(handle)
    }

    /// Wait up to `timeout` for `handle`'s job to finish.
    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        timeout: Duration,
    ) -> Result<RewriteOutcome, WaitError> {
        handle.wait(timeout).await
    }

    pub fn stats(&self) -> SchedulerStats {
        let shared = &self.shared;
        let queued = lock(&shared.queue).jobs.len();
        SchedulerStats {
            workers: shared.config.workers.max(1),
            queued,
            running: shared.counters.running.load(Ordering::Relaxed),
            outstanding: shared.outstanding.load(Ordering::SeqCst),
            submitted: shared.counters.submitted.load(Ordering::Relaxed),
            completed: shared.counters.completed.load(Ordering::Relaxed),
            failed: shared.counters.failed.load(Ordering::Relaxed),
            retried: shared.counters.retried.load(Ordering::Relaxed),
            rejected: shared.counters.rejected.load(Ordering::Relaxed),
            accepting: shared.accepting.load(Ordering::SeqCst),
        }
    }

    /// Recently completed jobs, newest first.
    pub fn recent_completed(&self) -> Vec<JobRecord> {
        lock(&self.shared.records).completed()
    }

    /// Recently failed jobs, newest first.
    pub fn recent_failed(&self) -> Vec<JobRecord> {
        lock(&self.shared.records).failed()
    }

    /// Stop admitting work and drain.
    ///
    /// Queued, running and retry-pending jobs get up to `drain_timeout` to
    /// finish. Whatever is still queued after that is failed without running,
    /// and the dispatcher exits. Jobs already running are left to complete on
    /// their own.
    pub async fn shutdown(&self, drain_timeout: Duration) -> DrainReport {
        let shared = &self.shared;
        if shared.accepting.swap(false, Ordering::SeqCst) {
            info!(
                scheduler = %shared.config.name,
                outstanding = shared.outstanding.load(Ordering::SeqCst),
                drain_timeout_ms = drain_timeout.as_millis() as u64,
                "scheduler draining"
            );
        }

        let drained = tokio::time::timeout(drain_timeout, shared.wait_idle())
            .await
            .is_ok();

        let leftovers = {
            let mut queue = lock(&shared.queue);
            queue.stopped = true;
            queue.jobs.drain()
        };
        shared.wake.notify_one();
        shared.slots.close();

        let abandoned = leftovers.len();
        for Queued { mut job, notifier } in leftovers {
            let error = JobError::ShutDown.to_string();
            job.mark_abandoned(error.clone());
            let attempts = job.attempt;
            shared.finish(&job, &notifier, JobState::Failed { attempts, error });
        }

        let dispatcher = lock(&self.dispatcher).take();
        if let Some(dispatcher) = dispatcher {
            if let Err(e) = dispatcher.await {
                error!(scheduler = %shared.config.name, error = %e, "dispatcher task failed");
            }
        }

        if drained {
            info!(scheduler = %shared.config.name, "scheduler drained");
        } else {
            warn!(
                scheduler = %shared.config.name,
                abandoned,
                still_running = shared.counters.running.load(Ordering::Relaxed),
                "drain timeout elapsed"
            );
        }

        DrainReport { drained, abandoned }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(dispatcher) = lock(&self.dispatcher).take() {
            dispatcher.abort();
        }
    }
}

async fn dispatch_loop(shared: Arc<Shared>) {
    info!(
        scheduler = %shared.config.name,
        workers = shared.config.workers.max(1),
        max_queue_depth = shared.config.max_queue_depth,
        "scheduler started"
    );

    loop {
        let permit = match shared.slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let Some(queued) = shared.next_job().await else {
            break;
        };
        tokio::spawn(run_job(shared.clone(), queued, permit));
    }

    info!(scheduler = %shared.config.name, "scheduler stopped");
}

async fn run_job(shared: Arc<Shared>, queued: Queued, _permit: OwnedSemaphorePermit) {
    let Queued { mut job, notifier } = queued;

    job.mark_running();
    let started = Utc::now();
    shared.counters.running.fetch_add(1, Ordering::Relaxed);
    notifier.send_replace(JobState::Running { attempt: job.attempt });
    debug!(
        scheduler = %shared.config.name,
        job_id = %job.id,
        key = %job.key(),
        priority = %job.priority,
        attempt = job.attempt,
        "job started"
    );

    // A panicking handler fails the attempt instead of taking the worker down.
    let result = {
        let handler = shared.handler.clone();
        let attempt = job.clone();
        match tokio::spawn(async move { handler.handle(&attempt).await }).await {
            Ok(result) => result,
            Err(e) => Err(JobError::Panicked(e.to_string())),
        }
    };

    shared.counters.running.fetch_sub(1, Ordering::Relaxed);

    match result {
        Ok(outcome) => {
            job.mark_completed(started);
            debug!(
                scheduler = %shared.config.name,
                job_id = %job.id,
                key = %job.key(),
                attempt = job.attempt,
                "job completed"
            );
            shared.finish(&job, &notifier, JobState::Completed(outcome));
        }
        Err(err) => {
            let error = err.to_string();
            match job.mark_failed(error.clone(), started) {
                Some(delay) => {
                    warn!(
                        scheduler = %shared.config.name,
                        job_id = %job.id,
                        key = %job.key(),
                        attempt = job.attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "job failed, retry scheduled"
                    );
                    shared.counters.retried.fetch_add(1, Ordering::Relaxed);
                    notifier.send_replace(JobState::RetryScheduled {
                        attempt: job.attempt,
                        error,
                    });
                    tokio::spawn(retry_after(shared.clone(), Queued { job, notifier }, delay));
                }
                None => {
                    error!(
                        scheduler = %shared.config.name,
                        job_id = %job.id,
                        key = %job.key(),
                        attempts = job.attempt,
                        error = %err,
                        "job failed permanently"
                    );
                    let attempts = job.attempt;
                    shared.finish(&job, &notifier, JobState::Failed { attempts, error });
                }
            }
        }
    }
}

async fn retry_after(shared: Arc<Shared>, queued: Queued, delay: Duration) {
    tokio::time::sleep(delay).await;

    match shared.enqueue(queued) {
        Ok(()) => debug!(scheduler = %shared.config.name, "job re-queued for retry"),
        Err(Queued { mut job, notifier }) => {
            let error = JobError::ShutDown.to_string();
            warn!(
                scheduler = %shared.config.name,
                job_id = %job.id,
                key = %job.key(),
                "retry dropped, scheduler stopped"
            );
            job.mark_abandoned(error.clone());
            let attempts = job.attempt;
            shared.finish(&job, &notifier, JobState::Failed { attempts, error });
        }
    }
}
