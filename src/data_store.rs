//! # Data Storage Abstraction
//!
//! Two traits describe everything the HTTP layers need from storage:
//!
//! - [`RecordStore`] keeps catalog records.  Records travel as `serde_json::Value` rows
//!   tagged with their [`RecordKind`], so one implementation serves all seven types.
//! - [`AccountStore`] keeps accounts, API tokens and login sessions.
//!
//! ## Storage Model
//!
//! ```text
//! RecordKind ──┬── row (id, fields...) ──── link fields hold target ids
//!              └── ordering (fields..., id)
//! Account ──┬── Token (one)
//!           └── Session (many)
//! ```
//!
//! Writes check that every link target exists and that one-to-one links stay one-to-one.
//! Deleting a record deletes everything linking to it, transitively.
//!
//! ## Implementations
//!
//! - **InMemoryDataStore**: mutex-guarded maps, used by tests and `gardend --in-memory`
//! - **PgStore**: PostgreSQL through `sqlx` (see [`crate::sql`])
//!
//! ```rust
//! # use garden::{InMemoryDataStore, RecordKind, RecordStore};
//! # use serde_json::json;
//! # tokio_test_block(async {
//! let store = InMemoryDataStore::new();
//! let id = uuid::Uuid::new_v4();
//! let row = json!({"id": id, "depart": "Russia", "region": "Moscow"});
//! store.insert(RecordKind::Herbarium, &row).await.unwrap();
//! assert_eq!(store.count(RecordKind::Herbarium).await.unwrap(), 1);
//! assert!(store.delete(RecordKind::Herbarium, id).await.unwrap());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::account::{Account, Session};
use crate::errors::StoreError;
use crate::record::{Record, RecordKind};

/// Storage for catalog records.
///
/// Every row is a JSON object with an `id` key and one key per column.  Implementations
/// enforce link integrity and cascade deletes; field validation happens before rows reach
/// the store.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists every record of `kind` in its default order.
    async fn list(&self, kind: RecordKind) -> Result<Vec<Value>, StoreError>;

    /// Counts the records of `kind`.
    async fn count(&self, kind: RecordKind) -> Result<u64, StoreError>;

    /// Fetches one record.
    async fn get(&self, kind: RecordKind, id: Uuid) -> Result<Option<Value>, StoreError>;

    /// Inserts a new record.
    ///
    /// # Returns
    /// * `Err(StoreError::AlreadyExists)` - a record with the same id exists
    /// * `Err(StoreError::MissingReference)` - a link field points nowhere
    /// * `Err(StoreError::DuplicateLink)` - a one-to-one link target is already taken
    async fn insert(&self, kind: RecordKind, row: &Value) -> Result<(), StoreError>;

    /// Replaces every column of an existing record.
    ///
    /// Fails with `StoreError::NotFound` when the record does not exist and with the link
    /// errors of [`RecordStore::insert`].
    async fn update(&self, kind: RecordKind, id: Uuid, row: &Value) -> Result<(), StoreError>;

    /// Deletes a record and, transitively, every record linking to it.
    ///
    /// Returns false when the record did not exist.
    async fn delete(&self, kind: RecordKind, id: Uuid) -> Result<bool, StoreError>;
}

/// Storage for accounts, API tokens and login sessions.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Creates an account; usernames are unique.
    async fn create_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Looks an account up by username.
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Looks an account up by id.
    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Returns the API token of an account, if it has one.
    async fn token_for_account(&self, account: Uuid) -> Result<Option<String>, StoreError>;

    /// Stores the API token of an account, replacing any previous one.
    async fn save_token(&self, account: Uuid, token: &str) -> Result<(), StoreError>;

    /// Resolves an API token to its account.
    async fn account_for_token(&self, token: &str) -> Result<Option<Account>, StoreError>;

    /// Stores a new login session.
    async fn create_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Resolves an unexpired session key to its account.
    async fn account_for_session(&self, key: &str) -> Result<Option<Account>, StoreError>;

    /// Removes a session; returns false when it did not exist.
    async fn delete_session(&self, key: &str) -> Result<bool, StoreError>;
}

///////////////////////////////////////////// typed helpers ////////////////////////////////////////////

/// Inserts a typed record.
pub async fn insert_record<R: Record>(store: &dyn RecordStore, record: &R) -> Result<(), StoreError> {
    let row = serde_json::to_value(record)?;
    store.insert(R::KIND, &row).await
}

/// Fetches a typed record.
pub async fn get_record<R: Record>(
    store: &dyn RecordStore,
    id: Uuid,
) -> Result<Option<R>, StoreError> {
    match store.get(R::KIND, id).await? {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

/// Lists typed records in their default order.
pub async fn list_records<R: Record>(store: &dyn RecordStore) -> Result<Vec<R>, StoreError> {
    store
        .list(R::KIND)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

////////////////////////////////////////////// row helpers /////////////////////////////////////////////

/// Reads the `id` key of a row.
pub fn row_id(row: &Value) -> Result<Uuid, StoreError> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::SerializationError("row has no valid id".to_string()))
}

/// Reads a link field of a row; null and absent both mean "no link".
pub fn link_target(row: &Value, field: &str) -> Result<Option<Uuid>, StoreError> {
    match row.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| StoreError::MissingReference(field.to_string())),
        Some(_) => Err(StoreError::MissingReference(field.to_string())),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        // nulls sort last, as in PostgreSQL ascending order
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Compares two rows by the default ordering of `kind`.
pub fn compare_rows(kind: RecordKind, a: &Value, b: &Value) -> Ordering {
    for field in kind.ordering() {
        let ordering = compare_values(a.get(*field), b.get(*field));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/////////////////////////////////////////// InMemoryDataStore //////////////////////////////////////////

type Table = BTreeMap<Uuid, Value>;

#[derive(Debug, Default)]
struct AccountTables {
    accounts: HashMap<Uuid, Account>,
    tokens: HashMap<String, Uuid>,
    sessions: HashMap<String, Session>,
}

/// In-memory implementation of [`RecordStore`] and [`AccountStore`].
///
/// One mutex guards all record tables so link checks and cascades see a consistent view.
#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    records: Mutex<HashMap<RecordKind, Table>>,
    accounts: Mutex<AccountTables>,
}

impl InMemoryDataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<RecordKind, Table>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Internal("record tables poisoned".to_string()))
    }

    fn accounts(&self) -> Result<MutexGuard<'_, AccountTables>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Internal("account tables poisoned".to_string()))
    }
}

fn check_links(
    tables: &HashMap<RecordKind, Table>,
    kind: RecordKind,
    id: Uuid,
    row: &Value,
) -> Result<(), StoreError> {
    for link in kind.links() {
        let Some(target) = link_target(row, link.field)? else {
            continue;
        };
        let exists = tables
            .get(&link.target)
            .is_some_and(|table| table.contains_key(&target));
        if !exists {
            return Err(StoreError::MissingReference(link.field.to_string()));
        }
        if link.unique {
            let taken = tables.get(&kind).is_some_and(|table| {
                table.iter().any(|(other, other_row)| {
                    *other != id
                        && matches!(link_target(other_row, link.field), Ok(Some(t)) if t == target)
                })
            });
            if taken {
                return Err(StoreError::DuplicateLink(link.field.to_string()));
            }
        }
    }
    Ok(())
}

fn cascade(tables: &mut HashMap<RecordKind, Table>, kind: RecordKind, id: Uuid) -> bool {
    let existed = tables
        .get_mut(&kind)
        .is_some_and(|table| table.remove(&id).is_some());
    if !existed {
        return false;
    }
    let mut pending = vec![(kind, id)];
    while let Some((kind, id)) = pending.pop() {
        for (referrer, link) in kind.referrers() {
            let Some(table) = tables.get_mut(&referrer) else {
                continue;
            };
            let doomed: Vec<Uuid> = table
                .iter()
                .filter(|(_, row)| matches!(link_target(row, link.field), Ok(Some(t)) if t == id))
                .map(|(doomed, _)| *doomed)
                .collect();
            for doomed in doomed {
                table.remove(&doomed);
                tracing::debug!(kind = %referrer, id = %doomed, "cascading delete");
                pending.push((referrer, doomed));
            }
        }
    }
    true
}

#[async_trait::async_trait]
impl RecordStore for InMemoryDataStore {
    async fn list(&self, kind: RecordKind) -> Result<Vec<Value>, StoreError> {
        let tables = self.records()?;
        let mut rows: Vec<Value> = tables
            .get(&kind)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| compare_rows(kind, a, b));
        Ok(rows)
    }

    async fn count(&self, kind: RecordKind) -> Result<u64, StoreError> {
        let tables = self.records()?;
        Ok(tables.get(&kind).map(|t| t.len() as u64).unwrap_or(0))
    }

    async fn get(&self, kind: RecordKind, id: Uuid) -> Result<Option<Value>, StoreError> {
        let tables = self.records()?;
        Ok(tables.get(&kind).and_then(|t| t.get(&id)).cloned())
    }

    async fn insert(&self, kind: RecordKind, row: &Value) -> Result<(), StoreError> {
        let id = row_id(row)?;
        let mut tables = self.records()?;
        if tables.get(&kind).is_some_and(|t| t.contains_key(&id)) {
            return Err(StoreError::AlreadyExists);
        }
        check_links(&tables, kind, id, row)?;
        tables.entry(kind).or_default().insert(id, row.clone());
        Ok(())
    }

    async fn update(&self, kind: RecordKind, id: Uuid, row: &Value) -> Result<(), StoreError> {
        let mut tables = self.records()?;
        if !tables.get(&kind).is_some_and(|t| t.contains_key(&id)) {
            return Err(StoreError::NotFound);
        }
        check_links(&tables, kind, id, row)?;
        let mut row = row.clone();
        if let Some(object) = row.as_object_mut() {
            object.insert("id".to_string(), Value::String(id.to_string()));
        }
        tables.entry(kind).or_default().insert(id, row);
        Ok(())
    }

    async fn delete(&self, kind: RecordKind, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.records()?;
        Ok(cascade(&mut tables, kind, id))
    }
}

#[async_trait::async_trait]
impl AccountStore for InMemoryDataStore {
    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut tables = self.accounts()?;
        if tables.accounts.contains_key(&account.id)
            || tables
                .accounts
                .values()
                .any(|other| other.username == account.username)
        {
            return Err(StoreError::AlreadyExists);
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.accounts()?;
        Ok(tables
            .accounts
            .values()
            .find(|account| account.username == username)
            .cloned())
    }

    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts()?.accounts.get(&id).cloned())
    }

    async fn token_for_account(&self, account: Uuid) -> Result<Option<String>, StoreError> {
        let tables = self.accounts()?;
        Ok(tables
            .tokens
            .iter()
            .find(|(_, owner)| **owner == account)
            .map(|(token, _)| token.clone()))
    }

    async fn save_token(&self, account: Uuid, token: &str) -> Result<(), StoreError> {
        let mut tables = self.accounts()?;
        if !tables.accounts.contains_key(&account) {
            return Err(StoreError::NotFound);
        }
        tables.tokens.retain(|_, owner| *owner != account);
        tables.tokens.insert(token.to_string(), account);
        Ok(())
    }

    async fn account_for_token(&self, token: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.accounts()?;
        Ok(tables
            .tokens
            .get(token)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut tables = self.accounts()?;
        if !tables.accounts.contains_key(&session.account) {
            return Err(StoreError::NotFound);
        }
        if tables.sessions.contains_key(&session.key) {
            return Err(StoreError::AlreadyExists);
        }
        let now = Utc::now();
        tables.sessions.retain(|_, existing| !existing.is_expired_at(&now));
        tables.sessions.insert(session.key.clone(), session.clone());
        Ok(())
    }

    async fn account_for_session(&self, key: &str) -> Result<Option<Account>, StoreError> {
        let mut tables = self.accounts()?;
        let now = Utc::now();
        let Some(session) = tables.sessions.get(key) else {
            return Ok(None);
        };
        if session.is_expired_at(&now) {
            tables.sessions.remove(key);
            return Ok(None);
        }
        let account = session.account;
        Ok(tables.accounts.get(&account).cloned())
    }

    async fn delete_session(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.accounts()?.sessions.remove(key).is_some())
    }
}
