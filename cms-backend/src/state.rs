use std::sync::Arc;

use cms_config::Config;
use cms_db::DbPool;
use cms_dump_client::DumpClient;
use cms_jobs::{
    register_default_jobs, BackupManager, DefaultJobs, ModerationSweeper, RetentionSweeper,
    SensitiveTerms,
};
use cms_scheduler::{JobScheduler, SchedulerError};

/// Shared services: one pool, one backup manager, one scheduler per process.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub backups: Arc<BackupManager>,
    pub scheduler: JobScheduler,
    config: Arc<Config>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backups", &self.backups)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(db_pool: DbPool, dumper: Arc<dyn DumpClient>, config: Config) -> Self {
        let backups = Arc::new(BackupManager::new(
            db_pool.clone(),
            dumper,
            &config.backups.directory,
        ));
        Self {
            scheduler: JobScheduler::new(config.scheduler.max_concurrent_jobs),
            db_pool,
            backups,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers the recurring jobs. Safe to call more than once.
    pub async fn register_jobs(&self) -> Result<usize, SchedulerError> {
        let moderation = self.config.moderation.enabled.then(|| {
            ModerationSweeper::new(
                self.db_pool.clone(),
                SensitiveTerms::new(&self.config.moderation.sensitive_terms),
            )
        });
        register_default_jobs(
            &self.scheduler,
            DefaultJobs {
                backups: Arc::clone(&self.backups),
                retention: RetentionSweeper::new(self.db_pool.clone()),
                retention_days: self.config.backups.retention_days,
                moderation,
            },
        )
        .await
    }
}
