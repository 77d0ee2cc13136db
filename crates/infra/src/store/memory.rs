//! In-process result store.
//!
//! Entries carry an expiry instant and read as missing once it passes. Writes
//! sweep expired entries out of their map, at most once per sweep interval.
//! Expiry uses `tokio::time::Instant`, so tests running on a paused clock can
//! advance past a TTL.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

use retone_core::RequestKey;

use super::{DEFAULT_TTL, ResultStore, VERSION_TTL_FACTOR};

/// Upper bound on the time between sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Expiring values plus the time of the last sweep.
#[derive(Debug)]
struct Table<T> {
    items: HashMap<RequestKey, Expiring<T>>,
    swept_at: Instant,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            items: HashMap::new(),
            swept_at: Instant::now(),
        }
    }

    fn live(&self, key: &RequestKey) -> Option<&T> {
        self.items.get(key).filter(|e| e.live()).map(|e| &e.value)
    }

    /// Drop expired entries if `interval` has passed since the last sweep.
    fn sweep(&mut self, interval: Duration) {
        let now = Instant::now();
        if now.duration_since(self.swept_at) < interval {
            return;
        }
        self.items.retain(|_, e| e.live());
        self.swept_at = now;
    }
}

/// In-memory [`ResultStore`].
///
/// `set_available(false)` makes every operation behave like a backend outage
/// (logged, then miss/no-op), which is how degradation paths get exercised
/// without Redis.
#[derive(Debug)]
pub struct InMemoryResultStore {
    default_ttl: Duration,
    entries: RwLock<Table<String>>,
    versions: RwLock<Table<VecDeque<String>>>,
    available: AtomicBool,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: RwLock::new(Table::new()),
            versions: RwLock::new(Table::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn reachable(&self, op: &'static str, key: &RequestKey) -> bool {
        let up = self.available.load(Ordering::SeqCst);
        if !up {
            warn!(store = "memory", op, key = %key, "result store unavailable");
        }
        up
    }

    fn version_ttl(&self) -> Duration {
        self.default_ttl * VERSION_TTL_FACTOR
    }

    fn sweep_interval(&self) -> Duration {
        self.default_ttl.min(MAX_SWEEP_INTERVAL)
    }
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &RequestKey) -> Option<String> {
        if !self.reachable("get", key) {
            return None;
        }
        self.entries.read().await.live(key).cloned()
    }

    async fn set(&self, key: &RequestKey, value: &str, ttl: Option<Duration>) {
        if !self.reachable("set", key) {
            return;
        }
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut entries = self.entries.write().await;
        entries.sweep(self.sweep_interval());
        entries
            .items
            .insert(key.clone(), Expiring::new(value.to_string(), ttl));
    }

    async fn get_versions(&self, key: &RequestKey) -> Vec<String> {
        if !self.reachable("get_versions", key) {
            return Vec::new();
        }
        let versions = self.versions.read().await;
        versions
            .live(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn add_version(&self, key: &RequestKey, value: &str) {
        if !self.reachable("add_version", key) {
            return;
        }
        let ttl = self.version_ttl();
        let mut versions = self.versions.write().await;
        versions.sweep(self.sweep_interval());
        let entry = versions
            .items
            .entry(key.clone())
            .or_insert_with(|| Expiring::new(VecDeque::new(), ttl));
        if !entry.live() {
            entry.value.clear();
        }
        entry.value.push_front(value.to_string());
        entry.expires_at = Instant::now() + ttl;
    }

    async fn exists(&self, key: &RequestKey) -> bool {
        if !self.reachable("exists", key) {
            return false;
        }
        self.entries.read().await.live(key).is_some()
    }
}
