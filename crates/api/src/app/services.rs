//! Infrastructure wiring: pick the result store, open the coordinator.

use std::sync::Arc;

use tracing::{info, warn};

use retone_ai::Generator;
use retone_infra::store::RedisResultStore;
use retone_infra::{Coordinator, InMemoryResultStore, ResultStore, RetoneConfig, StoreError};

/// Redis when `REDIS_URL` is set, otherwise an in-process store.
pub async fn open_store(config: &RetoneConfig) -> Result<Arc<dyn ResultStore>, StoreError> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisResultStore::connect(url, config.cache_ttl).await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("REDIS_URL not set; results are cached in memory and lost on restart");
            Ok(Arc::new(InMemoryResultStore::with_ttl(config.cache_ttl)))
        }
    }
}

/// Open the store and start the coordinator's workers.
pub async fn build_coordinator(
    config: &RetoneConfig,
    generator: Arc<dyn Generator>,
) -> Result<Arc<Coordinator>, StoreError> {
    let store = open_store(config).await?;
    info!(store = store.name(), "result store ready");
    Ok(Arc::new(Coordinator::open(
        config.coordinator.clone(),
        store,
        generator,
    )))
}
