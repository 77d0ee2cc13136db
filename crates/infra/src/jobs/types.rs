//! Core job types and policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use retone_ai::GenerationError;
use retone_core::{JobId, RequestKey, RewriteOutcome, RewriteRequest, Tone};

/// Scheduling tier. Lower values are dequeued first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub u8);

impl Priority {
    /// First-time rewrites.
    pub const FRESH: Priority = Priority(5);
    /// Try-again rewrites wait behind fresh work.
    pub const TRY_AGAIN: Priority = Priority(10);

    pub fn for_request(try_again: bool) -> Self {
        if try_again {
            Self::TRY_AGAIN
        } else {
            Self::FRESH
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a rewrite job carries into the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteJob {
    pub text: String,
    pub tones: Vec<Tone>,
    pub try_again: bool,
    pub key: RequestKey,
}

impl RewriteJob {
    pub fn from_request(request: &RewriteRequest) -> Self {
        Self {
            text: request.text.clone(),
            tones: request.tones.clone(),
            try_again: request.try_again,
            key: request.key(),
        }
    }
}

/// Job execution status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting for a worker
    Pending,
    /// Currently being executed
    Running,
    /// Completed successfully
    Completed,
    /// Failed, a retry timer is pending
    RetryScheduled { error: String, attempt: u32 },
    /// Exhausted retries or abandoned at shutdown
    Failed { error: String, attempts: u32 },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed { .. })
    }
}

/// What waiters observe on a job's completion channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running { attempt: u32 },
    RetryScheduled { attempt: u32, error: String },
    Completed(RewriteOutcome),
    Failed { attempts: u32, error: String },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed(_) | JobState::Failed { .. })
    }
}

/// Exponential retry policy: `base * 2^(attempt - 1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (1 = no retries)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    /// Three attempts, retried after 2 s and then 4 s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 2_u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Why one attempt of a job failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("job handler panicked: {0}")]
    Panicked(String),

    #[error("scheduler shut down before the job ran")]
    ShutDown,
}

/// A queued rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub payload: RewriteJob,
    pub priority: Priority,
    pub status: JobStatus,
    pub retry_policy: RetryPolicy,
    /// Attempts started so far
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Errors and timings of earlier attempts
    pub history: Vec<JobAttemptRecord>,
}

/// Record of a job execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAttemptRecord {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl Job {
    pub fn new(payload: RewriteJob, priority: Priority) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            payload,
            priority,
            status: JobStatus::Pending,
            retry_policy: RetryPolicy::default(),
            attempt: 0,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn key(&self) -> &RequestKey {
        &self.payload.key
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.attempt += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.updated_at = now;
        self.record_attempt(started_at, now, None);
    }

    /// Record a failed attempt.
    ///
    /// Returns the backoff before the next attempt, or `None` when the policy
    /// is exhausted and the job is now terminally failed.
    pub fn mark_failed(&mut self, error: String, started_at: DateTime<Utc>) -> Option<Duration> {
        let now = Utc::now();
        self.updated_at = now;
        self.record_attempt(started_at, now, Some(error.clone()));

        if self.retry_policy.should_retry(self.attempt) {
            self.status = JobStatus::RetryScheduled {
                error,
                attempt: self.attempt,
            };
            Some(self.retry_policy.delay_for_attempt(self.attempt))
        } else {
            self.status = JobStatus::Failed {
                error,
                attempts: self.attempt,
            };
            None
        }
    }

    /// Fail a job that never got to run (shutdown).
    pub fn mark_abandoned(&mut self, error: String) {
        self.status = JobStatus::Failed {
            error,
            attempts: self.attempt,
        };
        self.updated_at = Utc::now();
    }

    fn record_attempt(&mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>, error: Option<String>) {
        self.history.push(JobAttemptRecord {
            attempt: self.attempt,
            started_at,
            finished_at,
            success: error.is_none(),
            error,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
        });
    }
}
