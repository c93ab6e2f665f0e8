//! Record operations for PostgreSQL database.
//!
//! Every record type lives in its own table inside the `garden` schema.  Rows move in and
//! out of the database as JSONB: `jsonb_populate_record` turns a row object into a tuple
//! of the table type, and `to_jsonb` turns a tuple back into an object.  This keeps one set
//! of statements for all seven record types.

use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::record::{FieldType, RecordKind};

/// Result type for database operations.
pub type SqlResult<T> = Result<T, StoreError>;

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn table(kind: RecordKind) -> String {
    format!("garden.{}", quote(kind.table()))
}

fn column_list(kind: RecordKind) -> String {
    kind.columns()
        .iter()
        .map(|column| quote(column.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn order_by(kind: RecordKind) -> String {
    kind.ordering()
        .iter()
        .map(|field| {
            let text = kind
                .columns()
                .iter()
                .any(|c| c.name == *field && c.field_type == FieldType::Text);
            if text {
                // byte order, so results do not depend on the database locale
                format!("t.{} COLLATE \"C\"", quote(field))
            } else {
                format!("t.{}", quote(field))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps constraint violations onto the link errors of the record store.
fn classify(kind: RecordKind, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default();
        let field = constraint
            .strip_prefix(kind.table())
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(constraint);
        if db_err.is_foreign_key_violation() {
            let field = field.strip_suffix("_fkey").unwrap_or(field);
            return StoreError::MissingReference(field.to_string());
        }
        if db_err.is_unique_violation() {
            if let Some(field) = field.strip_suffix("_key") {
                return StoreError::DuplicateLink(field.to_string());
            }
            return StoreError::AlreadyExists;
        }
        if db_err.is_check_violation() {
            return StoreError::Internal(format!("check constraint {} failed", constraint));
        }
    }
    tracing::error!(kind = %kind, error = %err, "database error");
    StoreError::from(err)
}

/// Lists every record of `kind` in its default order.
///
/// # Examples
/// ```no_run
/// # use garden::{RecordKind, sql};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = pool.begin().await?;
/// let floras = sql::record::list(&mut tx, RecordKind::Flora).await?;
/// tx.commit().await?;
/// println!("{} floras", floras.len());
/// # Ok(())
/// # }
/// ```
pub async fn list(tx: &mut Transaction<'_, Postgres>, kind: RecordKind) -> SqlResult<Vec<Value>> {
    let statement = format!(
        "SELECT to_jsonb(t) FROM {} t ORDER BY {}",
        table(kind),
        order_by(kind)
    );
    sqlx::query_scalar::<_, Value>(&statement)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| classify(kind, e))
}

/// Counts the records of `kind`.
pub async fn count(tx: &mut Transaction<'_, Postgres>, kind: RecordKind) -> SqlResult<u64> {
    let statement = format!("SELECT COUNT(*) FROM {}", table(kind));
    let count = sqlx::query_scalar::<_, i64>(&statement)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| classify(kind, e))?;
    Ok(count.max(0) as u64)
}

/// Fetches one record.
pub async fn get(
    tx: &mut Transaction<'_, Postgres>,
    kind: RecordKind,
    id: Uuid,
) -> SqlResult<Option<Value>> {
    let statement = format!("SELECT to_jsonb(t) FROM {} t WHERE t.id = $1", table(kind));
    sqlx::query_scalar::<_, Value>(&statement)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| classify(kind, e))
}

/// Inserts a new record from its row object.
///
/// # Returns
/// * `Err(StoreError::AlreadyExists)` - the id is taken
/// * `Err(StoreError::MissingReference)` - a link target does not exist
/// * `Err(StoreError::DuplicateLink)` - a one-to-one link target is already linked
pub async fn create(
    tx: &mut Transaction<'_, Postgres>,
    kind: RecordKind,
    row: &Value,
) -> SqlResult<()> {
    let columns = column_list(kind);
    let statement = format!(
        "INSERT INTO {table} ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1)",
        table = table(kind),
        columns = columns,
    );
    sqlx::query(&statement)
        .bind(Json(row))
        .execute(&mut **tx)
        .await
        .map_err(|e| classify(kind, e))?;
    Ok(())
}

/// Replaces every column except `id` of an existing record.
///
/// Returns false when no record has the id.
pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    kind: RecordKind,
    id: Uuid,
    row: &Value,
) -> SqlResult<bool> {
    let columns = kind
        .columns()
        .iter()
        .filter(|column| column.name != "id")
        .map(|column| quote(column.name))
        .collect::<Vec<_>>()
        .join(", ");
    let statement = format!(
        "UPDATE {table} SET ({columns}) = (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $2)) WHERE id = $1",
        table = table(kind),
        columns = columns,
    );
    let result = sqlx::query(&statement)
        .bind(id)
        .bind(Json(row))
        .execute(&mut **tx)
        .await
        .map_err(|e| classify(kind, e))?;
    Ok(result.rows_affected() > 0)
}

/// Deletes a record; foreign keys cascade the delete to every record linking to it.
pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    kind: RecordKind,
    id: Uuid,
) -> SqlResult<bool> {
    let statement = format!("DELETE FROM {} WHERE id = $1", table(kind));
    let result = sqlx::query(&statement)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| classify(kind, e))?;
    Ok(result.rows_affected() > 0)
}
