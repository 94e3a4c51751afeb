//! [`JobHandler`] implementations wired into the scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use cms_scheduler::{JobError, JobHandler};
use tracing::info;

use crate::backup::{BackupKind, BackupManager, BackupStatus};
use crate::moderation::ModerationSweeper;
use crate::retention::RetentionSweeper;

/// Scheduled backup creation.
///
/// A `failed` record is still a completed attempt from the manager's point of
/// view; it is reported as a job failure so the run history shows it.
#[derive(Debug)]
pub struct CreateBackupJob {
    manager: Arc<BackupManager>,
    description: String,
}

impl CreateBackupJob {
    pub fn new(manager: Arc<BackupManager>, description: impl Into<String>) -> Self {
        Self {
            manager,
            description: description.into(),
        }
    }
}

#[async_trait]
impl JobHandler for CreateBackupJob {
    async fn run(&self) -> Result<(), JobError> {
        let record = self
            .manager
            .create(BackupKind::Auto, &self.description, None)
            .await?;
        match record.status {
            BackupStatus::Success => Ok(()),
            BackupStatus::Failed => Err(JobError::failed(format!(
                "backup {} recorded as failed",
                record.id
            ))),
        }
    }
}

/// Scheduled retention sweep over automatic backups.
#[derive(Debug)]
pub struct CleanBackupsJob {
    sweeper: RetentionSweeper,
    retention_days: u32,
}

impl CleanBackupsJob {
    pub fn new(sweeper: RetentionSweeper, retention_days: u32) -> Self {
        Self {
            sweeper,
            retention_days,
        }
    }
}

#[async_trait]
impl JobHandler for CleanBackupsJob {
    async fn run(&self) -> Result<(), JobError> {
        let removed = self
            .sweeper
            .sweep(self.retention_days, cms_db::now_local())
            .await?;
        if removed > 0 {
            info!(removed, "aged automatic backups removed");
        }
        Ok(())
    }
}

/// Scheduled comment moderation sweep.
#[derive(Debug)]
pub struct ModerateCommentsJob {
    sweeper: ModerationSweeper,
}

impl ModerateCommentsJob {
    pub fn new(sweeper: ModerationSweeper) -> Self {
        Self { sweeper }
    }
}

#[async_trait]
impl JobHandler for ModerateCommentsJob {
    async fn run(&self) -> Result<(), JobError> {
        self.sweeper.sweep().await?;
        Ok(())
    }
}
