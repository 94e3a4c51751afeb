//! Removal of aged automatic backups.

use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use cms_db::backup_records;
use cms_db::DbPool;
use tracing::{debug, info, warn};

use crate::backup::remove_artifact;
use crate::error::BackupError;

/// Deletes automatic backups older than a retention window. Manual backups
/// are kept regardless of age.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    pool: DbPool,
}

impl RetentionSweeper {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Removes every `auto` record with `backup_time < now - retention_days`,
    /// file first, then row.
    ///
    /// Best effort: a record whose file or row cannot be removed is logged and
    /// left for the next sweep. Only failing to select the candidates is an
    /// error. Returns the number of rows removed.
    pub async fn sweep(&self, retention_days: u32, now: NaiveDateTime) -> Result<usize, BackupError> {
        let cutoff = now - Duration::days(i64::from(retention_days));
        let aged = backup_records::list_aged_auto(&self.pool, cutoff).await?;
        debug!(candidates = aged.len(), %cutoff, "retention sweep started");

        let mut removed = 0;
        for record in aged {
            if let Err(e) = remove_artifact(Path::new(&record.backup_path)).await {
                warn!(
                    backup_id = record.id,
                    path = %record.backup_path,
                    error = %e,
                    "could not remove aged backup file, keeping record"
                );
                continue;
            }
            match backup_records::delete_by_id(&self.pool, record.id).await {
                Ok(true) => removed += 1,
                Ok(false) => debug!(backup_id = record.id, "record already gone"),
                Err(e) => warn!(backup_id = record.id, error = %e, "could not delete aged backup record"),
            }
        }

        info!(removed, retention_days, "retention sweep finished");
        Ok(removed)
    }
}
