//! Worker-side handling of one rewrite job.
//!
//! Two paths:
//! - fresh: generate from the tone prompt, then write the main entry and push
//!   the first version
//! - retry: read the version history, ask for something unlike every earlier
//!   version, push it and make it the main entry
//!
//! A try-again job with no history is served by the fresh path and flagged with
//! `fresh_fallback`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use retone_ai::{GenerationOptions, Generator, extract_rewrite, fresh_conversation, retry_conversation};
use retone_core::RewriteOutcome;

use crate::jobs::{Job, JobError, JobHandler, RewriteJob};
use crate::store::ResultStore;

pub struct RewriteProcessor {
    store: Arc<dyn ResultStore>,
    generator: Arc<dyn Generator>,
}

impl RewriteProcessor {
    pub fn new(store: Arc<dyn ResultStore>, generator: Arc<dyn Generator>) -> Self {
        Self { store, generator }
    }

    /// Run one rewrite, scheduling aside.
    pub async fn process(&self, job: &RewriteJob) -> Result<RewriteOutcome, JobError> {
        if !job.try_again {
            return self.fresh(job).await;
        }

        let previous = self.store.get_versions(&job.key).await;
        if previous.is_empty() {
            debug!(key = %job.key, "no version history, serving try-again as fresh");
            let outcome = self.fresh(job).await?;
            return Ok(outcome.with_fresh_fallback(true));
        }

        self.retry(job, previous).await
    }

    async fn fresh(&self, job: &RewriteJob) -> Result<RewriteOutcome, JobError> {
        let messages = fresh_conversation(&job.text, &job.tones);
        let options = GenerationOptions::for_rewrite(&job.text, &job.tones);

        let reply = self.generator.generate(&messages, &options).await?;
        let result = extract_rewrite(&reply)?;

        self.store.set(&job.key, &result, None).await;
        self.store.add_version(&job.key, &result).await;

        debug!(key = %job.key, generator = self.generator.name(), "fresh rewrite stored");
        Ok(RewriteOutcome::fresh(result, job.key.clone()))
    }

    async fn retry(&self, job: &RewriteJob, previous: Vec<String>) -> Result<RewriteOutcome, JobError> {
        let messages = retry_conversation(&job.text, &job.tones, &previous);
        let options = GenerationOptions::for_rewrite(&job.text, &job.tones);

        let reply = self.generator.generate(&messages, &options).await?;
        let result = extract_rewrite(&reply)?;

        self.store.add_version(&job.key, &result).await;
        self.store.set(&job.key, &result, None).await;

        // A degraded store may not have recorded the new version.
        let total = self
            .store
            .get_versions(&job.key)
            .await
            .len()
            .max(previous.len() + 1);

        debug!(
            key = %job.key,
            generator = self.generator.name(),
            total_versions = total,
            "try-again rewrite stored"
        );
        Ok(RewriteOutcome::retried(result, job.key.clone(), total))
    }
}

#[async_trait]
impl JobHandler for RewriteProcessor {
    async fn handle(&self, job: &Job) -> Result<RewriteOutcome, JobError> {
        self.process(&job.payload).await
    }
}
