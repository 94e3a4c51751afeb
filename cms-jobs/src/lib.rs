//! Backup, retention and moderation jobs for the back office.
//!
//! - [`BackupManager`] creates, restores and deletes database backups
//! - [`RetentionSweeper`] removes aged automatic backups
//! - [`ModerationSweeper`] hides visible comments containing sensitive terms
//!
//! [`register_default_jobs`] wires all three into a [`JobScheduler`] under
//! stable ids, so calling it again on an already populated scheduler is a
//! no-op.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cms_dump_client::{CommandDumpClient, DumpTarget};
//! use cms_jobs::{register_default_jobs, BackupManager, DefaultJobs, ModerationSweeper,
//!     RetentionSweeper, SensitiveTerms};
//! use cms_scheduler::JobScheduler;
//!
//! # async fn run(pool: cms_db::DbPool) -> Result<(), Box<dyn std::error::Error>> {
//! let dumper = Arc::new(CommandDumpClient::new(DumpTarget::Sqlite { path: "museum.sqlite".into() }));
//! let manager = Arc::new(BackupManager::new(pool.clone(), dumper, "backups"));
//!
//! let scheduler = JobScheduler::default();
//! register_default_jobs(
//!     &scheduler,
//!     DefaultJobs {
//!         backups: manager,
//!         retention: RetentionSweeper::new(pool.clone()),
//!         retention_days: 30,
//!         moderation: Some(ModerationSweeper::new(pool, SensitiveTerms::new(["spam"]))),
//!     },
//! )
//! .await?;
//! scheduler.start().await;
//! # Ok(())
//! # }
//! ```

mod backup;
mod error;
mod handlers;
mod moderation;
mod retention;

use std::sync::Arc;
use std::time::Duration;

use cms_scheduler::{JobScheduler, SchedulerError, Trigger, Weekday};
use tracing::info;

pub use backup::{
    artifact_name, Actor, BackupKind, BackupManager, BackupPage, BackupRecord, BackupStatus,
    BACKUP_TABLES,
};
pub use error::{BackupError, ModerationError};
pub use handlers::{CleanBackupsJob, CreateBackupJob, ModerateCommentsJob};
pub use moderation::{ModerationReport, ModerationSweeper, SensitiveTerms};
pub use retention::RetentionSweeper;

/// Stable job identifiers.
pub mod job_ids {
    pub const MODERATE_COMMENTS: &str = "auto_moderate_comments_task";
    pub const CREATE_BACKUP: &str = "scheduled_create_backup_task_v2";
    pub const CLEAN_BACKUPS: &str = "scheduled_clean_backups_task_v2";
}

/// Description stored on scheduled backup records.
pub const SCHEDULED_BACKUP_DESCRIPTION: &str = "scheduled backup";

const MODERATION_GRACE: Duration = Duration::from_secs(60);
const BACKUP_GRACE: Duration = Duration::from_secs(3600);

/// Services the default jobs run against. Moderation is skipped when `None`.
#[derive(Debug)]
pub struct DefaultJobs {
    pub backups: Arc<BackupManager>,
    pub retention: RetentionSweeper,
    pub retention_days: u32,
    pub moderation: Option<ModerationSweeper>,
}

/// Registers the back office's recurring jobs:
///
/// | id | trigger | misfire grace |
/// |---|---|---|
/// | `auto_moderate_comments_task` | every minute | 60 s |
/// | `scheduled_create_backup_task_v2` | daily at 03:00 | 1 h |
/// | `scheduled_clean_backups_task_v2` | Sundays at 04:00 | 1 h |
///
/// Returns how many jobs were newly added.
pub async fn register_default_jobs(
    scheduler: &JobScheduler,
    jobs: DefaultJobs,
) -> Result<usize, SchedulerError> {
    let mut added = 0;

    if let Some(sweeper) = jobs.moderation {
        added += usize::from(
            scheduler
                .register(
                    job_ids::MODERATE_COMMENTS,
                    Trigger::every_minutes(1),
                    Arc::new(ModerateCommentsJob::new(sweeper)),
                    MODERATION_GRACE,
                )
                .await?,
        );
    }

    added += usize::from(
        scheduler
            .register(
                job_ids::CREATE_BACKUP,
                Trigger::daily_at(3, 0),
                Arc::new(CreateBackupJob::new(
                    jobs.backups,
                    SCHEDULED_BACKUP_DESCRIPTION,
                )),
                BACKUP_GRACE,
            )
            .await?,
    );

    added += usize::from(
        scheduler
            .register(
                job_ids::CLEAN_BACKUPS,
                Trigger::weekly_at(Weekday::Sun, 4, 0),
                Arc::new(CleanBackupsJob::new(jobs.retention, jobs.retention_days)),
                BACKUP_GRACE,
            )
            .await?,
    );

    info!(added, "default jobs registered");
    Ok(added)
}
