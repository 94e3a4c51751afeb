//! Backup lifecycle: create, restore, delete and browse backup artifacts.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use cms_db::backup_records::{self, BackupRecordRow, NewBackupRecord};
use cms_db::operation_logs::{self, NewOperationLog};
use cms_db::DbPool;
use cms_dump_client::DumpClient;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::BackupError;

/// Tables written to every backup. Favorites (`loves`) are left out on purpose.
pub const BACKUP_TABLES: &[&str] = &[
    "admin_users",
    "operation_logs",
    "backup_records",
    "mobile_users",
    "web_users",
    "met_clear",
    "comments",
];

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    /// Requested by an administrator.
    Manual,
    /// Created by the scheduler.
    Auto,
}

impl BackupKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown backup type `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Success,
    Failed,
}

impl BackupStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown backup status `{other}`")),
        }
    }
}

/// Outcome of one backup attempt. Failed attempts have `size == 0` and carry
/// the error text at the end of `description`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub id: i64,
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub time: NaiveDateTime,
    pub kind: BackupKind,
    pub status: BackupStatus,
    pub description: String,
}

impl TryFrom<BackupRecordRow> for BackupRecord {
    type Error = BackupError;

    fn try_from(row: BackupRecordRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| BackupError::InvalidRecord { id: row.id, reason };
        Ok(Self {
            id: row.id,
            kind: row.backup_type.parse().map_err(invalid)?,
            status: row.status.parse().map_err(invalid)?,
            size: u64::try_from(row.backup_size).unwrap_or(0),
            name: row.backup_name,
            path: PathBuf::from(row.backup_path),
            time: row.backup_time,
            description: row.description,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupPage {
    pub total: i64,
    pub items: Vec<BackupRecord>,
}

/// Administrator on whose behalf an operation runs; recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub ip_address: Option<String>,
}

impl Actor {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            ip_address: None,
        }
    }

    #[must_use]
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// `backup_<YYYYMMDDHHMMSS>.sql`. Two attempts in the same second share a
/// name; the later one overwrites the earlier artifact.
pub fn artifact_name(at: NaiveDateTime) -> String {
    format!("backup_{}.sql", at.format("%Y%m%d%H%M%S"))
}

/// Creates, restores and deletes backups and their records.
pub struct BackupManager {
    pool: DbPool,
    dumper: Arc<dyn DumpClient>,
    directory: PathBuf,
}

impl fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupManager")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl BackupManager {
    pub fn new(pool: DbPool, dumper: Arc<dyn DumpClient>, directory: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            dumper,
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Dumps the backup tables into a new artifact and records the attempt.
    ///
    /// Dump and filesystem failures do not make this return `Err`: they are
    /// written as a `failed` record and that record is returned. The only
    /// error is failing to write the record itself.
    pub async fn create(
        &self,
        kind: BackupKind,
        description: &str,
        actor: Option<&Actor>,
    ) -> Result<BackupRecord, BackupError> {
        let time = cms_db::now_local();
        let name = artifact_name(time);
        let path = self.directory.join(&name);
        // a same-second artifact from another create is never cleaned up here
        let preexisting = tokio::fs::try_exists(&path).await.unwrap_or(true);

        let (status, size, description) = match self.write_artifact(&path).await {
            Ok(size) => (BackupStatus::Success, size, description.to_string()),
            Err(e) => {
                error!(backup_name = %name, kind = %kind, error = %e, "backup dump failed");
                if !preexisting {
                    remove_partial_artifact(&path).await;
                }
                (BackupStatus::Failed, 0, format!("{description}\nerror: {e}"))
            }
        };

        let path_text = path.to_string_lossy();
        let mut tx = self.pool.begin().await?;
        let id = backup_records::insert(
            &mut *tx,
            &NewBackupRecord {
                backup_name: &name,
                backup_path: &path_text,
                backup_size: i64::try_from(size).unwrap_or(i64::MAX),
                backup_time: time,
                backup_type: kind.as_str(),
                status: status.as_str(),
                description: &description,
            },
        )
        .await?;

        if let (Some(actor), BackupStatus::Success) = (actor, status) {
            audit(
                &mut *tx,
                actor,
                "backup",
                &format!("created database backup (id: {id}, name: {name})"),
            )
            .await?;
        }
        tx.commit().await?;

        info!(backup_id = id, backup_name = %name, kind = %kind, status = %status, size, "backup recorded");

        Ok(BackupRecord {
            id,
            name,
            path,
            size,
            time,
            kind,
            status,
            description,
        })
    }

    async fn write_artifact(&self, path: &Path) -> Result<u64, BackupError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        self.dumper.dump(BACKUP_TABLES, path).await?;
        Ok(tokio::fs::metadata(path).await?.len())
    }

    /// Replays the artifact of record `id` into the database.
    ///
    /// Unlike [`create`](Self::create), every failure is returned to the
    /// caller. The record itself is left as it was.
    pub async fn restore(&self, id: i64, actor: Option<&Actor>) -> Result<(), BackupError> {
        let record = self.get(id).await?;
        ensure_artifact_exists(&record).await?;

        warn!(backup_id = id, backup_name = %record.name, "restoring database from backup");
        if let Err(e) = self.dumper.restore(&record.path).await {
            error!(backup_id = id, error = %e, "restore failed");
            return Err(e.into());
        }
        info!(backup_id = id, backup_name = %record.name, "restore completed");

        if let Some(actor) = actor {
            audit(
                &self.pool,
                actor,
                "restore",
                &format!("restored database backup (id: {id}, name: {})", record.name),
            )
            .await?;
        }
        Ok(())
    }

    /// Removes the artifact (if still present) and the record.
    pub async fn delete(&self, id: i64, actor: Option<&Actor>) -> Result<(), BackupError> {
        let record = self.get(id).await?;
        remove_artifact(&record.path).await?;

        let mut tx = self.pool.begin().await?;
        backup_records::delete_by_id(&mut *tx, id).await?;
        if let Some(actor) = actor {
            audit(
                &mut *tx,
                actor,
                "backup",
                &format!("deleted database backup (id: {id}, name: {})", record.name),
            )
            .await?;
        }
        tx.commit().await?;

        info!(backup_id = id, backup_name = %record.name, "backup deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<BackupRecord, BackupError> {
        backup_records::find_by_id(&self.pool, id)
            .await?
            .ok_or(BackupError::RecordNotFound(id))?
            .try_into()
    }

    /// One page of records, newest first. `page` is 1-based.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<BackupPage, BackupError> {
        let per_page = match per_page {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        let offset = i64::from(page.max(1) - 1) * i64::from(per_page);

        let total = backup_records::count(&self.pool).await?;
        let items = backup_records::list(&self.pool, i64::from(per_page), offset)
            .await?
            .into_iter()
            .map(BackupRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BackupPage { total, items })
    }

    /// Location of a downloadable artifact.
    pub async fn artifact_path(&self, id: i64) -> Result<PathBuf, BackupError> {
        let record = self.get(id).await?;
        ensure_artifact_exists(&record).await?;
        Ok(record.path)
    }
}

async fn ensure_artifact_exists(record: &BackupRecord) -> Result<(), BackupError> {
    match tokio::fs::try_exists(&record.path).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(BackupError::ArtifactNotFound {
            id: record.id,
            path: record.path.clone(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Removes a file, treating an already missing one as success.
pub(crate) async fn remove_artifact(path: &Path) -> Result<(), io::Error> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn remove_partial_artifact(path: &Path) {
    if let Err(e) = remove_artifact(path).await {
        warn!(path = %path.display(), error = %e, "could not remove partial backup file");
    }
}

async fn audit<'e, E>(
    executor: E,
    actor: &Actor,
    operation_type: &str,
    content: &str,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = cms_db::DbBackend>,
{
    operation_logs::insert(
        executor,
        &NewOperationLog {
            admin_id: actor.id,
            admin_username: &actor.username,
            operation_type,
            operation_content: content,
            operation_time: cms_db::now_local(),
            ip_address: actor.ip_address.as_deref(),
        },
    )
    .await
}
