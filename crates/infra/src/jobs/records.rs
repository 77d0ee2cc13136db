//! Bounded history of finished jobs.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retone_core::{JobId, RequestKey};

use super::types::{Job, JobStatus, Priority};

/// Completed jobs kept for inspection.
pub const COMPLETED_HISTORY: usize = 50;
/// Failed jobs kept for inspection.
pub const FAILED_HISTORY: usize = 100;

/// Summary of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub key: RequestKey,
    pub priority: Priority,
    pub try_again: bool,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn from_job(job: &Job) -> Self {
        let error = match &job.status {
            JobStatus::Failed { error, .. } => Some(error.clone()),
            _ => None,
        };
        Self {
            id: job.id,
            key: job.payload.key.clone(),
            priority: job.priority,
            try_again: job.payload.try_again,
            attempts: job.attempt,
            created_at: job.created_at,
            finished_at: job.updated_at,
            error,
        }
    }
}

/// Most-recent-last ring buffers of completed and failed jobs.
#[derive(Debug)]
pub struct JobRecords {
    completed: VecDeque<JobRecord>,
    failed: VecDeque<JobRecord>,
    completed_cap: usize,
    failed_cap: usize,
}

impl JobRecords {
    pub fn new(completed_cap: usize, failed_cap: usize) -> Self {
        Self {
            completed: VecDeque::with_capacity(completed_cap),
            failed: VecDeque::with_capacity(failed_cap),
            completed_cap,
            failed_cap,
        }
    }

    pub fn push_completed(&mut self, record: JobRecord) {
        push_bounded(&mut self.completed, record, self.completed_cap);
    }

    pub fn push_failed(&mut self, record: JobRecord) {
        push_bounded(&mut self.failed, record, self.failed_cap);
    }

    /// Newest first.
    pub fn completed(&self) -> Vec<JobRecord> {
        self.completed.iter().rev().cloned().collect()
    }

    /// Newest first.
    pub fn failed(&self) -> Vec<JobRecord> {
        self.failed.iter().rev().cloned().collect()
    }
}

impl Default for JobRecords {
    fn default() -> Self {
        Self::new(COMPLETED_HISTORY, FAILED_HISTORY)
    }
}

fn push_bounded(buf: &mut VecDeque<JobRecord>, record: JobRecord, cap: usize) {
    if cap == 0 {
        return;
    }
    while buf.len() >= cap {
        buf.pop_front();
    }
    buf.push_back(record);
}
