//! Request dispatch: validation, cache lookup, job submission and waiting.
//!
//! A fresh request that hits the cache is answered without touching the
//! scheduler. Everything else becomes a job at the tier for its kind, and the
//! caller waits for it up to the dispatch timeout.
//!
//! Fresh misses for a key that already has a fresh job in flight join that job
//! instead of generating again. Try-again requests always get their own job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use retone_ai::Generator;
use retone_core::{DomainError, JobId, RequestKey, RewriteOutcome, RewriteRequest, Tone, VersionsView};

use crate::jobs::{
    JobHandle, JobRecord, Priority, RewriteJob, Scheduler, SchedulerConfig, SchedulerError,
    SchedulerStats, WaitError,
};
use crate::processor::RewriteProcessor;
use crate::store::ResultStore;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long a dispatch waits for its job
    pub dispatch_timeout: Duration,
    /// How long shutdown waits for admitted jobs
    pub drain_timeout: Duration,
    /// Merge concurrent fresh misses for one key into one job
    pub single_flight: bool,
    pub scheduler: SchedulerConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(30),
            single_flight: true,
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("request rejected: {0}")]
    Rejected(#[from] SchedulerError),

    #[error("rewrite job {job_id} timed out after {waited:?}")]
    Timeout { job_id: JobId, waited: Duration },

    #[error("rewrite job {job_id} failed after {attempts} attempts: {error}")]
    JobFailed {
        job_id: JobId,
        attempts: u32,
        error: String,
    },
}

impl From<WaitError> for DispatchError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout { job_id, waited } => Self::Timeout { job_id, waited },
            WaitError::Failed {
                job_id,
                attempts,
                error,
            } => Self::JobFailed {
                job_id,
                attempts,
                error,
            },
            WaitError::Abandoned { job_id } => Self::JobFailed {
                job_id,
                attempts: 0,
                error: "job was dropped before finishing".to_string(),
            },
        }
    }
}

/// Recently finished jobs, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct RecentJobs {
    pub completed: Vec<JobRecord>,
    pub failed: Vec<JobRecord>,
}

pub struct Coordinator {
    config: CoordinatorConfig,
    store: Arc<dyn ResultStore>,
    scheduler: Scheduler,
    in_flight: Mutex<HashMap<RequestKey, JobHandle>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Coordinator {
    /// Start the scheduler and its workers on the current tokio runtime.
    pub fn open(
        config: CoordinatorConfig,
        store: Arc<dyn ResultStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        info!(
            store = store.name(),
            generator = generator.name(),
            workers = config.scheduler.workers,
            dispatch_timeout_ms = config.dispatch_timeout.as_millis() as u64,
            "opening rewrite coordinator"
        );

        let processor = Arc::new(RewriteProcessor::new(store.clone(), generator));
        let scheduler = Scheduler::start(config.scheduler.clone(), processor);

        Self {
            config,
            store,
            scheduler,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Serve one rewrite request.
    pub async fn dispatch(&self, request: &RewriteRequest) -> Result<RewriteOutcome, DispatchError> {
        request.validate()?;
        let key = request.key();

        if !request.try_again {
            if let Some(cached) = self.store.get(&key).await {
                let versions = self.store.get_versions(&key).await;
                debug!(key = %key, versions = versions.len(), "cache hit");
                return Ok(RewriteOutcome::cached(cached, key, versions.len()));
            }
        }

        let handle = self.enqueue(request)?;
        let outcome = handle.wait(self.config.dispatch_timeout).await?;
        Ok(outcome)
    }

    fn enqueue(&self, request: &RewriteRequest) -> Result<JobHandle, SchedulerError> {
        let priority = Priority::for_request(request.try_again);
        let job = RewriteJob::from_request(request);

        if request.try_again || !self.config.single_flight {
            return self.scheduler.submit(job, priority);
        }

        let mut in_flight = lock(&self.in_flight);
        in_flight.retain(|_, handle| !handle.is_finished());

        if let Some(existing) = in_flight.get(&job.key) {
            debug!(key = %job.key, job_id = %existing.id(), "joining in-flight rewrite");
            return Ok(existing.clone());
        }

        let key = job.key.clone();
        let handle = self.scheduler.submit(job, priority)?;
        in_flight.insert(key, handle.clone());
        Ok(handle)
    }

    /// Every stored version for `(text, tones)`.
    pub async fn versions(&self, text: &str, tones: &[Tone]) -> Result<VersionsView, DispatchError> {
        let request = RewriteRequest::new(text, tones.to_vec());
        request.validate()?;
        let key = request.key();
        let versions = self.store.get_versions(&key).await;
        Ok(VersionsView::new(key, versions))
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn recent_jobs(&self) -> RecentJobs {
        RecentJobs {
            completed: self.scheduler.recent_completed(),
            failed: self.scheduler.recent_failed(),
        }
    }

    /// Drain the scheduler, then release the store.
    pub async fn shutdown(&self) {
        let report = self.scheduler.shutdown(self.config.drain_timeout).await;
        lock(&self.in_flight).clear();
        self.store.close().await;
        info!(
            drained = report.drained,
            abandoned = report.abandoned,
            "rewrite coordinator shut down"
        );
    }
}
