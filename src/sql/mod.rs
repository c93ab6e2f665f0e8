//! PostgreSQL database operations for garden.
//!
//! The submodules hold one function per statement, each taking an open transaction.
//! [`PgStore`] wraps a connection pool and runs every store operation in its own
//! transaction.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::{Account, Session};
use crate::data_store::{AccountStore, RecordStore};
use crate::errors::StoreError;
use crate::record::RecordKind;

/// Account, token and session operations.
pub mod account;

/// Record operations over the seven catalog tables.
pub mod record;

/////////////////////////////////////////////// PgStore ////////////////////////////////////////////////

/// PostgreSQL implementation of [`RecordStore`] and [`AccountStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl RecordStore for PgStore {
    async fn list(&self, kind: RecordKind) -> Result<Vec<Value>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let rows = record::list(&mut tx, kind).await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn count(&self, kind: RecordKind) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let count = record::count(&mut tx, kind).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn get(&self, kind: RecordKind, id: Uuid) -> Result<Option<Value>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = record::get(&mut tx, kind, id).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn insert(&self, kind: RecordKind, row: &Value) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        record::create(&mut tx, kind, row).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, kind: RecordKind, id: Uuid, row: &Value) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        if !record::update(&mut tx, kind, id, row).await? {
            return Err(StoreError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, kind: RecordKind, id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = record::delete(&mut tx, kind, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait::async_trait]
impl AccountStore for PgStore {
    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        account::create(&mut tx, account).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let found = account::by_username(&mut tx, username).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let found = account::by_id(&mut tx, id).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn token_for_account(&self, owner: Uuid) -> Result<Option<String>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let token = account::token_for(&mut tx, owner).await?;
        tx.commit().await?;
        Ok(token)
    }

    async fn save_token(&self, owner: Uuid, token: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        account::save_token(&mut tx, owner, token).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn account_for_token(&self, token: &str) -> Result<Option<Account>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let found = account::by_token(&mut tx, token).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let purged = account::purge_expired_sessions(&mut tx).await?;
        if purged > 0 {
            tracing::debug!(purged, "removed expired sessions");
        }
        account::create_session(&mut tx, session).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn account_for_session(&self, key: &str) -> Result<Option<Account>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let found = account::by_session(&mut tx, key).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn delete_session(&self, key: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = account::delete_session(&mut tx, key).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}
