//! Rewrite job scheduling with priorities, retry and backoff.
//!
//! ## Design
//!
//! - Jobs carry a priority tier; lower tiers run first, FIFO within a tier
//! - A fixed number of workers run jobs concurrently
//! - Failed attempts are retried with exponential backoff, then fail terminally
//! - Waiters observe each job through a `watch` channel
//! - Recent completed and failed jobs are kept for inspection
//!
//! ## Components
//!
//! - `Job`: payload plus lifecycle and attempt history
//! - `PriorityQueue`: tiered FIFO queue
//! - `Scheduler`: dispatcher, worker pool, retry timers, shutdown drain
//! - `JobRecords`: bounded history of finished jobs

pub mod queue;
pub mod records;
pub mod scheduler;
pub mod types;

pub use queue::PriorityQueue;
pub use records::{COMPLETED_HISTORY, FAILED_HISTORY, JobRecord, JobRecords};
pub use scheduler::{
    DrainReport, JobHandle, JobHandler, Scheduler, SchedulerConfig, SchedulerError, SchedulerStats,
    WaitError,
};
pub use types::{
    Job, JobAttemptRecord, JobError, JobState, JobStatus, Priority, RetryPolicy,
    RewriteJob,
};
