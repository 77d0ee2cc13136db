//! Redis-backed result store (optional).
//!
//! Main entries are plain strings written with `SETEX`; version lists live
//! under `versions:{key}` and are grown with `LPUSH` + `EXPIRE` in one
//! `MULTI`/`EXEC` pipeline. The connection manager reconnects on its own, so a
//! Redis restart shows up here as a few logged misses.
//!
//! [`ResultStore::close`] drops the manager; later operations read as misses.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tracing::{info, warn};

use retone_core::RequestKey;

use super::{DEFAULT_TTL, ResultStore, StoreError, VERSION_TTL_FACTOR};

const VERSIONS_PREFIX: &str = "versions:";

pub struct RedisResultStore {
    conn: RwLock<Option<ConnectionManager>>,
    default_ttl: Duration,
}

impl RedisResultStore {
    /// Open a managed connection to `redis_url`.
    pub async fn connect(redis_url: &str, default_ttl: Duration) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(ttl_secs = default_ttl.as_secs(), "connected to redis result store");
        Ok(Self {
            conn: RwLock::new(Some(conn)),
            default_ttl,
        })
    }

    pub async fn connect_default(redis_url: &str) -> Result<Self, StoreError> {
        Self::connect(redis_url, DEFAULT_TTL).await
    }

    fn versions_key(key: &RequestKey) -> String {
        format!("{VERSIONS_PREFIX}{key}")
    }

    fn version_ttl_secs(&self) -> u64 {
        (self.default_ttl * VERSION_TTL_FACTOR).as_secs().max(1)
    }

    /// A handle on the managed connection, or `None` once closed.
    async fn connection(&self, op: &'static str, key: &RequestKey) -> Option<ConnectionManager> {
        let conn = self.conn.read().await.clone();
        if conn.is_none() {
            warn!(store = "redis", op, key = %key, "result store closed");
        }
        conn
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &RequestKey) -> Option<String> {
        let mut conn = self.connection("get", key).await?;
        match redis::cmd("GET")
            .arg(key.as_str())
            .query_async::<_, Option<String>>(&mut conn)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!(store = "redis", op = "get", key = %key, error = %e, "result store fault");
                None
            }
        }
    }

    async fn set(&self, key: &RequestKey, value: &str, ttl: Option<Duration>) {
        let Some(mut conn) = self.connection("set", key).await else {
            return;
        };
        let ttl_secs = ttl.unwrap_or(self.default_ttl).as_secs().max(1);
        if let Err(e) = redis::cmd("SETEX")
            .arg(key.as_str())
            .arg(ttl_secs)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
        {
            warn!(store = "redis", op = "set", key = %key, error = %e, "result store fault");
        }
    }

    async fn get_versions(&self, key: &RequestKey) -> Vec<String> {
        let Some(mut conn) = self.connection("get_versions", key).await else {
            return Vec::new();
        };
        match redis::cmd("LRANGE")
            .arg(Self::versions_key(key))
            .arg(0)
            .arg(-1)
            .query_async::<_, Vec<String>>(&mut conn)
            .await
        {
            Ok(versions) => versions,
            Err(e) => {
                warn!(store = "redis", op = "get_versions", key = %key, error = %e, "result store fault");
                Vec::new()
            }
        }
    }

    async fn add_version(&self, key: &RequestKey, value: &str) {
        let Some(mut conn) = self.connection("add_version", key).await else {
            return;
        };
        let list = Self::versions_key(key);
        let result = redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(&list)
            .arg(value)
            .ignore()
            .cmd("EXPIRE")
            .arg(&list)
            .arg(self.version_ttl_secs())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await;

        if let Err(e) = result {
            warn!(store = "redis", op = "add_version", key = %key, error = %e, "result store fault");
        }
    }

    async fn exists(&self, key: &RequestKey) -> bool {
        let Some(mut conn) = self.connection("exists", key).await else {
            return false;
        };
        match redis::cmd("EXISTS")
            .arg(key.as_str())
            .query_async::<_, i64>(&mut conn)
            .await
        {
            Ok(n) => n > 0,
            Err(e) => {
                warn!(store = "redis", op = "exists", key = %key, error = %e, "result store fault");
                false
            }
        }
    }

    async fn close(&self) {
        // The socket goes once in-flight commands release their clones.
        if self.conn.write().await.take().is_some() {
            info!("redis result store closed");
        }
    }
}
