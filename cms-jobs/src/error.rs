//! Job execution errors.

use std::path::PathBuf;

use cms_dump_client::DumpError;
use cms_scheduler::JobError;
use thiserror::Error;

/// Errors surfaced by backup creation, restore, deletion and retention.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup record {0} does not exist")]
    RecordNotFound(i64),

    #[error("backup file for record {id} is missing: {}", path.display())]
    ArtifactNotFound { id: i64, path: PathBuf },

    #[error("external dump tool failed: {0}")]
    ExternalProcess(#[from] DumpError),

    #[error("backup store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("backup record {id} is malformed: {reason}")]
    InvalidRecord { id: i64, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// True for an unknown record id or a record whose file is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound(_) | Self::ArtifactNotFound { .. })
    }
}

/// Errors surfaced by the comment moderation sweep.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("comment store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<BackupError> for JobError {
    fn from(err: BackupError) -> Self {
        JobError::failed(err)
    }
}

impl From<ModerationError> for JobError {
    fn from(err: ModerationError) -> Self {
        JobError::failed(err)
    }
}
