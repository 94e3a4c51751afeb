//! Role-gated backup and job administration.
//!
//! Each operation takes the caller's resolved identity and answers with a JSON
//! body, the same shape whether it is reached from the console or from an HTTP
//! front end.

use std::path::PathBuf;

use cms_auth::{require_role, Identity, BACKUP_ADMIN_ROLES};
use cms_jobs::{Actor, BackupKind, BackupRecord, BackupStatus};
use cms_scheduler::{JobInfo, JobRun};
use serde_json::{json, Value};
use tracing::info;

use crate::error::AdminError;
use crate::state::AppState;

const DEFAULT_RUNS_PER_PAGE: usize = 20;

/// Who is asking, and from where.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller<'a> {
    pub identity: Option<&'a Identity>,
    pub ip_address: Option<&'a str>,
}

impl<'a> Caller<'a> {
    pub fn new(identity: Option<&'a Identity>) -> Self {
        Self {
            identity,
            ip_address: None,
        }
    }

    #[must_use]
    pub fn with_ip_address(mut self, ip: &'a str) -> Self {
        self.ip_address = Some(ip);
        self
    }

    fn authorize(&self) -> Result<Actor, AdminError> {
        let identity = require_role(BACKUP_ADMIN_ROLES, self.identity)?;
        let actor = Actor::new(identity.id, identity.username.clone());
        Ok(match self.ip_address {
            Some(ip) => actor.with_ip_address(ip),
            None => actor,
        })
    }
}

fn backup_json(record: &BackupRecord) -> Value {
    json!({
        "id": record.id,
        "name": record.name,
        "size": record.size,
        "time": record.time.format("%Y-%m-%d %H:%M:%S").to_string(),
        "type": record.kind.as_str(),
        "status": record.status.as_str(),
        "description": record.description,
    })
}

fn run_json(run: &JobRun) -> Value {
    json!({
        "id": run.id,
        "jobName": run.job_name,
        "triggeredBy": run.triggered_by.to_string(),
        "status": run.status.to_string(),
        "startedAt": run.started_at.to_rfc3339(),
        "finishedAt": run.finished_at.map(|dt| dt.to_rfc3339()),
        "errorMessage": run.error_message,
    })
}

fn job_json(job: &JobInfo) -> Value {
    json!({
        "id": job.id,
        "trigger": job.trigger.to_string(),
        "misfireGraceSecs": job.misfire_grace_secs,
        "nextDue": job.next_due.map(|dt| dt.to_rfc3339()),
        "running": job.running,
    })
}

/// One page of backup records, newest first.
pub async fn list_backups(
    state: &AppState,
    caller: Caller<'_>,
    page: u32,
    per_page: u32,
) -> Result<Value, AdminError> {
    caller.authorize()?;
    let result = state.backups.list(page, per_page).await?;
    let items: Vec<Value> = result.items.iter().map(backup_json).collect();
    Ok(json!({
        "items": items,
        "pagination": {
            "page": page.max(1),
            "perPage": per_page,
            "total": result.total,
        }
    }))
}

/// Creates a manual backup. A dump failure is reported in the body with
/// `success: false`; the failed record still exists.
pub async fn create_backup(
    state: &AppState,
    caller: Caller<'_>,
    description: &str,
) -> Result<Value, AdminError> {
    let actor = caller.authorize()?;
    let record = state
        .backups
        .create(BackupKind::Manual, description.trim(), Some(&actor))
        .await?;
    info!(admin = %actor.username, backup_id = record.id, status = %record.status, "manual backup requested");
    Ok(json!({
        "success": record.status == BackupStatus::Success,
        "backup": backup_json(&record),
    }))
}

pub async fn restore_backup(
    state: &AppState,
    caller: Caller<'_>,
    id: i64,
) -> Result<Value, AdminError> {
    let actor = caller.authorize()?;
    state.backups.restore(id, Some(&actor)).await?;
    Ok(json!({ "success": true, "id": id }))
}

pub async fn delete_backup(
    state: &AppState,
    caller: Caller<'_>,
    id: i64,
) -> Result<Value, AdminError> {
    let actor = caller.authorize()?;
    state.backups.delete(id, Some(&actor)).await?;
    Ok(json!({ "success": true, "id": id }))
}

/// Location of a backup file for download.
pub async fn backup_download_path(
    state: &AppState,
    caller: Caller<'_>,
    id: i64,
) -> Result<PathBuf, AdminError> {
    caller.authorize()?;
    Ok(state.backups.artifact_path(id).await?)
}

pub async fn list_jobs(state: &AppState, caller: Caller<'_>) -> Result<Value, AdminError> {
    caller.authorize()?;
    let jobs: Vec<Value> = state.scheduler.jobs().await.iter().map(job_json).collect();
    Ok(json!({ "items": jobs }))
}

/// Job runs, newest first, optionally for one job.
pub async fn list_job_runs(
    state: &AppState,
    caller: Caller<'_>,
    job_name: Option<&str>,
    page: usize,
    per_page: usize,
) -> Result<Value, AdminError> {
    caller.authorize()?;
    let page = page.max(1);
    let per_page = if per_page == 0 {
        DEFAULT_RUNS_PER_PAGE
    } else {
        per_page
    };
    let offset = (page - 1).saturating_mul(per_page);

    let total = state.scheduler.count_runs(job_name).await;
    let runs = state.scheduler.list_runs(job_name, per_page, offset).await;
    let items: Vec<Value> = runs.iter().map(run_json).collect();
    Ok(json!({
        "items": items,
        "pagination": {
            "page": page,
            "perPage": per_page,
            "total": total,
        }
    }))
}

/// Runs a job now and waits for it to finish.
pub async fn run_job(
    state: &AppState,
    caller: Caller<'_>,
    job_name: &str,
) -> Result<Value, AdminError> {
    let actor = caller.authorize()?;
    if job_name.trim().is_empty() {
        return Err(AdminError::bad_request("missing job name"));
    }
    info!(admin = %actor.username, job_id = job_name, "manual job run requested");
    let run = state.scheduler.run_now(job_name).await?;
    Ok(run_json(&run))
}

pub async fn clear_job_runs(state: &AppState, caller: Caller<'_>) -> Result<Value, AdminError> {
    caller.authorize()?;
    state.scheduler.clear_runs().await;
    Ok(json!({ "success": true }))
}
