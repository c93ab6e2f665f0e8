//! Shared application state handed to every request handler.

use std::sync::Arc;

use crate::config::GardenConfig;
use crate::data_store::{AccountStore, InMemoryDataStore, RecordStore};
use crate::object_store::{InMemoryObjectStore, LocalObjectStore, ObjectStore};
use crate::sql::PgStore;

/// Store handles and configuration, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Catalog records.
    pub records: Arc<dyn RecordStore>,
    /// Accounts, tokens and sessions.
    pub accounts: Arc<dyn AccountStore>,
    /// Uploaded objects.
    pub objects: Arc<dyn ObjectStore>,
    /// Server configuration.
    pub config: Arc<GardenConfig>,
}

impl AppState {
    /// Assembles state from explicit parts.
    pub fn new(
        records: Arc<dyn RecordStore>,
        accounts: Arc<dyn AccountStore>,
        objects: Arc<dyn ObjectStore>,
        config: GardenConfig,
    ) -> Self {
        Self {
            records,
            accounts,
            objects,
            config: Arc::new(config),
        }
    }

    /// Everything in memory: records, accounts and objects.
    pub fn in_memory(config: GardenConfig) -> Self {
        let store = Arc::new(InMemoryDataStore::new());
        Self::new(
            store.clone(),
            store,
            Arc::new(InMemoryObjectStore::new()),
            config,
        )
    }

    /// Records and accounts in PostgreSQL, objects under the configured media root.
    pub fn postgres(store: PgStore, config: GardenConfig) -> Self {
        let store = Arc::new(store);
        let objects = Arc::new(LocalObjectStore::new(config.media_root.clone()));
        Self::new(store.clone(), store, objects, config)
    }

    /// Creates every configured bucket; used for the startup consistency check.
    pub async fn ensure_buckets(&self) -> Result<(), crate::object_store::ObjectStoreError> {
        for bucket in self.config.buckets() {
            self.objects.ensure_bucket(&bucket).await?;
            tracing::info!(bucket = %bucket, "bucket checked");
        }
        Ok(())
    }
}
