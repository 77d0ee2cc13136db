//! Result cache and per-key version history.
//!
//! Two keyspaces hang off each [`RequestKey`]:
//! - the main entry: the latest rewrite, with a TTL
//! - the version list: every rewrite for the key, most recent first, kept for
//!   twice the main TTL so try-again requests still see history after the
//!   main entry expires
//!
//! Store operations are best-effort. Backend faults are logged inside the
//! implementation and reported as a miss (or a no-op for writes); callers never
//! see them.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use retone_core::RequestKey;

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryResultStore;
#[cfg(feature = "redis")]
pub use redis::RedisResultStore;

/// TTL for main entries when the caller passes none.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Version lists live this many times longer than main entries.
pub const VERSION_TTL_FACTOR: u32 = 2;

/// Cache of rewrites keyed by [`RequestKey`].
#[async_trait]
pub trait ResultStore: Send + Sync + 'static {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Latest rewrite for `key`, or `None` on miss or fault.
    async fn get(&self, key: &RequestKey) -> Option<String>;

    /// Overwrite the main entry and refresh its TTL (store default when `None`).
    async fn set(&self, key: &RequestKey, value: &str, ttl: Option<Duration>);

    /// Every stored version, most recent first. Empty on miss or fault.
    async fn get_versions(&self, key: &RequestKey) -> Vec<String>;

    /// Prepend `value` to the version list and refresh the list's TTL.
    async fn add_version(&self, key: &RequestKey, value: &str);

    async fn exists(&self, key: &RequestKey) -> bool;

    /// Release the backend connection.
    async fn close(&self) {}
}

/// Failure to open a store. Runtime faults never surface as errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
}
