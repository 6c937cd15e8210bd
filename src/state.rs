use crate::config::{ServerConfig, StoreKind};
use crate::store::{MemoryStore, MongoStore, SharedStore, StoreHandle};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Application state shared by all handlers.
///
/// The store is injected here once at startup; handlers reach it only
/// through [`AppState::store`].
pub struct AppState {
    config: Arc<ServerConfig>,
    store: StoreHandle,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, store: SharedStore) -> Self {
        let store = StoreHandle::new(store, config.request_timeout());
        Self { config, store }
    }

    /// Builds the backend selected by `config.store`.
    pub async fn connect(config: Arc<ServerConfig>) -> Result<Self> {
        let store: SharedStore = match config.store {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::Mongo => {
                let uri = config
                    .mongo_uri
                    .as_deref()
                    .context("mongo store selected but no connection URI configured")?;
                let store = MongoStore::connect(uri, &config.database)
                    .await
                    .context("failed to configure mongo client")?;
                Arc::new(store)
            }
        };
        info!(backend = store.backend(), "document store ready");
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }
}
