//! Queries for the `backup_records` table.
//!
//! Rows are written once by the backup manager and only ever deleted
//! afterwards; there is no update path.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::Executor;

use crate::DbBackend;

const SELECT_COLUMNS: &str = "SELECT id, backup_name, backup_path, backup_size, backup_time, \
     backup_type, status, description FROM backup_records";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BackupRecordRow {
    pub id: i64,
    pub backup_name: String,
    pub backup_path: String,
    pub backup_size: i64,
    pub backup_time: NaiveDateTime,
    pub backup_type: String,
    pub status: String,
    pub description: String,
}

/// Values for a row that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewBackupRecord<'a> {
    pub backup_name: &'a str,
    pub backup_path: &'a str,
    pub backup_size: i64,
    pub backup_time: NaiveDateTime,
    pub backup_type: &'a str,
    pub status: &'a str,
    pub description: &'a str,
}

/// Inserts a record and returns its generated id.
pub async fn insert<'e, E>(executor: E, record: &NewBackupRecord<'_>) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let result = sqlx::query(
        "INSERT INTO backup_records \
         (backup_name, backup_path, backup_size, backup_time, backup_type, status, description) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.backup_name)
    .bind(record.backup_path)
    .bind(record.backup_size)
    .bind(record.backup_time)
    .bind(record.backup_type)
    .bind(record.status)
    .bind(record.description)
    .execute(executor)
    .await?;

    #[cfg(feature = "sqlite")]
    let id = result.last_insert_rowid();
    #[cfg(feature = "mysql")]
    let id = result.last_insert_id() as i64;

    Ok(id)
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<BackupRecordRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query_as::<_, BackupRecordRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Newest first; ties on `backup_time` fall back to the higher id.
pub async fn list<'e, E>(
    executor: E,
    limit: i64,
    offset: i64,
) -> Result<Vec<BackupRecordRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query_as::<_, BackupRecordRow>(&format!(
        "{SELECT_COLUMNS} ORDER BY backup_time DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM backup_records")
        .fetch_one(executor)
        .await?;
    Ok(total)
}

/// Automatic backups strictly older than `cutoff`, oldest first.
pub async fn list_aged_auto<'e, E>(
    executor: E,
    cutoff: NaiveDateTime,
) -> Result<Vec<BackupRecordRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query_as::<_, BackupRecordRow>(&format!(
        "{SELECT_COLUMNS} WHERE backup_type = 'auto' AND backup_time < ? ORDER BY backup_time, id"
    ))
    .bind(cutoff)
    .fetch_all(executor)
    .await
}

/// Returns whether a row was removed.
pub async fn delete_by_id<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let result = sqlx::query("DELETE FROM backup_records WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
