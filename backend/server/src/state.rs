use std::sync::Arc;

use tracing::info;

use super::{
    auth::{IdentityResolver, SessionIdentity},
    config::{Config, StoreKind},
    database::{KvStore, RedisStore, StoreError, init_redis},
    memory::MemoryStore,
};

pub struct State {
    pub config: Config,
    pub store: Arc<dyn KvStore>,
    pub identity: Arc<dyn IdentityResolver>,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, StoreError> {
        let store: Arc<dyn KvStore> = match config.store {
            StoreKind::Redis => Arc::new(RedisStore::new(init_redis(&config.redis_url).await?)),
            StoreKind::Memory => {
                info!("Using in-memory store, projects will not survive a restart");
                Arc::new(MemoryStore::default())
            }
        };

        let identity = Arc::new(SessionIdentity::new(store.clone()));

        Ok(Self::from_parts(config, store, identity))
    }

    pub fn from_parts(
        config: Config,
        store: Arc<dyn KvStore>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            identity,
        })
    }
}
