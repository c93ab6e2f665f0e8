//! Account, token and session operations for PostgreSQL database.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::account::{Account, Session};
use crate::errors::StoreError;

use super::record::SqlResult;

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    password_hash: String,
    is_superuser: bool,
    is_active: bool,
    date_joined: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            date_joined: row.date_joined,
        }
    }
}

const ACCOUNT_COLUMNS: &str = "a.id, a.username, a.password_hash, a.is_superuser, a.is_active, a.date_joined";

/// Creates a new account.
///
/// # Returns
/// * `Err(StoreError::AlreadyExists)` - the id or username is taken
pub async fn create(tx: &mut Transaction<'_, Postgres>, account: &Account) -> SqlResult<()> {
    sqlx::query(
        r#"
        INSERT INTO garden.account (id, username, password_hash, is_superuser, is_active, date_joined)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(account.id)
    .bind(&account.username)
    .bind(&account.password_hash)
    .bind(account.is_superuser)
    .bind(account.is_active)
    .bind(account.date_joined)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Looks an account up by username.
pub async fn by_username(
    tx: &mut Transaction<'_, Postgres>,
    username: &str,
) -> SqlResult<Option<Account>> {
    let statement = format!(
        "SELECT {} FROM garden.account a WHERE a.username = $1",
        ACCOUNT_COLUMNS
    );
    let row = sqlx::query_as::<_, AccountRow>(&statement)
        .bind(username)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Account::from))
}

/// Looks an account up by id.
pub async fn by_id(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> SqlResult<Option<Account>> {
    let statement = format!("SELECT {} FROM garden.account a WHERE a.id = $1", ACCOUNT_COLUMNS);
    let row = sqlx::query_as::<_, AccountRow>(&statement)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Account::from))
}

/// Returns the API token of an account.
pub async fn token_for(tx: &mut Transaction<'_, Postgres>, account: Uuid) -> SqlResult<Option<String>> {
    let token = sqlx::query_scalar::<_, String>("SELECT key FROM garden.token WHERE account = $1")
        .bind(account)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(token)
}

/// Stores the API token of an account, replacing any previous token.
pub async fn save_token(
    tx: &mut Transaction<'_, Postgres>,
    account: Uuid,
    token: &str,
) -> SqlResult<()> {
    sqlx::query("DELETE FROM garden.token WHERE account = $1")
        .bind(account)
        .execute(&mut **tx)
        .await?;
    let result = sqlx::query("INSERT INTO garden.token (key, account) VALUES ($1, $2)")
        .bind(token)
        .bind(account)
        .execute(&mut **tx)
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            Err(StoreError::NotFound)
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolves an API token to its account.
pub async fn by_token(tx: &mut Transaction<'_, Postgres>, token: &str) -> SqlResult<Option<Account>> {
    let statement = format!(
        "SELECT {} FROM garden.account a JOIN garden.token t ON t.account = a.id WHERE t.key = $1",
        ACCOUNT_COLUMNS
    );
    let row = sqlx::query_as::<_, AccountRow>(&statement)
        .bind(token)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Account::from))
}

/// Deletes every expired session and returns how many went.
pub async fn purge_expired_sessions(tx: &mut Transaction<'_, Postgres>) -> SqlResult<u64> {
    let result = sqlx::query("DELETE FROM garden.session WHERE expires <= CURRENT_TIMESTAMP")
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

/// Stores a new session.
pub async fn create_session(tx: &mut Transaction<'_, Postgres>, session: &Session) -> SqlResult<()> {
    let result = sqlx::query("INSERT INTO garden.session (key, account, expires) VALUES ($1, $2, $3)")
        .bind(&session.key)
        .bind(session.account)
        .bind(session.expires)
        .execute(&mut **tx)
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            Err(StoreError::NotFound)
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolves an unexpired session key to its account.
pub async fn by_session(tx: &mut Transaction<'_, Postgres>, key: &str) -> SqlResult<Option<Account>> {
    let statement = format!(
        "SELECT {} FROM garden.account a JOIN garden.session s ON s.account = a.id \
         WHERE s.key = $1 AND s.expires > CURRENT_TIMESTAMP",
        ACCOUNT_COLUMNS
    );
    let row = sqlx::query_as::<_, AccountRow>(&statement)
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Account::from))
}

/// Removes a session.
pub async fn delete_session(tx: &mut Transaction<'_, Postgres>, key: &str) -> SqlResult<bool> {
    let result = sqlx::query("DELETE FROM garden.session WHERE key = $1")
        .bind(key)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accounts_tokens_sessions() {
        let Some(pool) = super::super::tests::setup_test_db().await else {
            return;
        };
        let account = Account::with_iterations("botanist", "pw", true, 1_000).unwrap();

        let mut tx = pool.begin().await.unwrap();
        create(&mut tx, &account).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let twin = Account::with_iterations("botanist", "pw", false, 1_000).unwrap();
        assert_eq!(create(&mut tx, &twin).await, Err(StoreError::AlreadyExists));
        tx.rollback().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let found = by_username(&mut tx, "botanist").await.unwrap().unwrap();
        assert_eq!(found.id, account.id);
        assert!(found.is_superuser);
        assert!(found.check_password("pw"));

        assert_eq!(token_for(&mut tx, account.id).await.unwrap(), None);
        save_token(&mut tx, account.id, &"c".repeat(40)).await.unwrap();
        assert_eq!(
            by_token(&mut tx, &"c".repeat(40)).await.unwrap().map(|a| a.id),
            Some(account.id)
        );

        let session = Session::open(account.id, 14);
        create_session(&mut tx, &session).await.unwrap();
        assert!(by_session(&mut tx, &session.key).await.unwrap().is_some());
        assert!(delete_session(&mut tx, &session.key).await.unwrap());
        assert!(by_session(&mut tx, &session.key).await.unwrap().is_none());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn expired_sessions_are_purged() {
        let Some(pool) = super::super::tests::setup_test_db().await else {
            return;
        };
        let account = Account::with_iterations("botanist", "pw", false, 1_000).unwrap();
        let mut tx = pool.begin().await.unwrap();
        create(&mut tx, &account).await.unwrap();
        let stale = Session::open(account.id, -1);
        let fresh = Session::open(account.id, 14);
        create_session(&mut tx, &stale).await.unwrap();
        create_session(&mut tx, &fresh).await.unwrap();
        assert_eq!(purge_expired_sessions(&mut tx).await.unwrap(), 1);
        assert!(!delete_session(&mut tx, &stale.key).await.unwrap());
        assert!(by_session(&mut tx, &fresh.key).await.unwrap().is_some());
        tx.commit().await.unwrap();
    }
}
