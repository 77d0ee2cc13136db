//! Infrastructure layer: result store, job scheduling, config, external services.
//!
//! - `store`: cache and version history (in-memory, Redis behind the `redis` feature)
//! - `jobs`: priority queue, worker pool, retry timers and job bookkeeping
//! - `processor`: what a worker does with one rewrite job
//! - `coordinator`: the entry point callers dispatch requests through

pub mod config;
pub mod coordinator;
pub mod external;
pub mod jobs;
pub mod processor;
pub mod store;

mod integration_tests;
#[cfg(test)]
mod testing;

pub use config::{ConfigError, MistralConfig, RetoneConfig};
pub use coordinator::{Coordinator, CoordinatorConfig, DispatchError, RecentJobs};
pub use processor::RewriteProcessor;
pub use store::{InMemoryResultStore, ResultStore, StoreError};
