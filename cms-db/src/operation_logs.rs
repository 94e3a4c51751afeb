use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::Executor;

use crate::DbBackend;

/// Audit entry for an administrative action.
#[derive(Debug, Clone)]
pub struct NewOperationLog<'a> {
    pub admin_id: i64,
    pub admin_username: &'a str,
    pub operation_type: &'a str,
    pub operation_content: &'a str,
    pub operation_time: NaiveDateTime,
    pub ip_address: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OperationLogRow {
    pub id: i64,
    pub admin_id: i64,
    pub admin_username: String,
    pub operation_type: String,
    pub operation_content: Option<String>,
    pub operation_time: NaiveDateTime,
    pub ip_address: Option<String>,
}

pub async fn insert<'e, E>(executor: E, entry: &NewOperationLog<'_>) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query(
        "INSERT INTO operation_logs \
         (admin_id, admin_username, operation_type, operation_content, operation_time, ip_address) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.admin_id)
    .bind(entry.admin_username)
    .bind(entry.operation_type)
    .bind(entry.operation_content)
    .bind(entry.operation_time)
    .bind(entry.ip_address)
    .execute(executor)
    .await?;
    Ok(())
}

/// Most recent entries first, optionally filtered by operation type.
pub async fn list_recent<'e, E>(
    executor: E,
    operation_type: Option<&str>,
    limit: i64,
) -> Result<Vec<OperationLogRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query_as::<_, OperationLogRow>(
        "SELECT id, admin_id, admin_username, operation_type, operation_content, operation_time, ip_address \
         FROM operation_logs WHERE (? IS NULL OR operation_type = ?) \
         ORDER BY operation_time DESC, id DESC LIMIT ?",
    )
    .bind(operation_type)
    .bind(operation_type)
    .bind(limit)
    .fetch_all(executor)
    .await
}
