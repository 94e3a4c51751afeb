#![cfg(feature = "sqlite")]

use std::path::Path;
use std::sync::Arc;

use cms_auth::{Identity, Role};
use cms_backend::{admin, AdminError, AppState, Caller};
use cms_db::{create_pool, DbConnectionConfig};
use cms_dump_client::{async_trait, DumpClient, DumpError};
use cms_jobs::job_ids;
use tempfile::TempDir;

struct WritingDumpClient;

#[async_trait]
impl DumpClient for WritingDumpClient {
    async fn dump(&self, _tables: &[&str], dest: &Path) -> Result<(), DumpError> {
        tokio::fs::write(dest, "-- dump\n").await?;
        Ok(())
    }

    async fn restore(&self, _src: &Path) -> Result<(), DumpError> {
        Ok(())
    }
}

async fn test_state(moderation: bool) -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("cms.sqlite").display());
    let pool = create_pool(&DbConnectionConfig::new(url))
        .await
        .expect("create pool");
    cms_migrations::sqlite_migrator()
        .run(&pool)
        .await
        .expect("run migrations");

    let mut config = cms_config::Config::default();
    config.backups.directory = dir.path().join("backups").display().to_string();
    config.moderation.enabled = moderation;

    let state = AppState::new(pool, Arc::new(WritingDumpClient), config);
    state.register_jobs().await.expect("register jobs");
    (dir, state)
}

fn admin_identity() -> Identity {
    Identity::new(5, "registrar", Role::Admin)
}

#[tokio::test]
async fn anonymous_callers_are_rejected() {
    let (_dir, state) = test_state(true).await;

    let err = admin::list_backups(&state, Caller::default(), 1, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Authentication(_)));
    assert_eq!(err.status_code(), 401);

    let err = admin::run_job(&state, Caller::default(), job_ids::CREATE_BACKUP)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 401);
    assert_eq!(state.scheduler.count_runs(None).await, 0);
}

#[tokio::test]
async fn backup_round_trip_through_admin_operations() {
    let (_dir, state) = test_state(true).await;
    let identity = admin_identity();
    let caller = Caller::new(Some(&identity)).with_ip_address("192.0.2.10");

    let created = admin::create_backup(&state, caller, "  before rehang  ")
        .await
        .expect("create");
    assert_eq!(created["success"], true);
    assert_eq!(created["backup"]["description"], "before rehang");
    assert_eq!(created["backup"]["type"], "manual");
    let id = created["backup"]["id"].as_i64().expect("id");

    let listed = admin::list_backups(&state, caller, 1, 10).await.unwrap();
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["items"][0]["id"], id);

    let path = admin::backup_download_path(&state, caller, id).await.unwrap();
    assert!(path.exists());

    admin::restore_backup(&state, caller, id).await.expect("restore");
    admin::delete_backup(&state, caller, id).await.expect("delete");
    assert!(!path.exists());

    let err = admin::restore_backup(&state, caller, id).await.unwrap_err();
    assert_eq!(err.status_code(), 404);

    let logs = cms_db::operation_logs::list_recent(&state.db_pool, None, 10)
        .await
        .unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.admin_username == "registrar"));
    assert!(logs
        .iter()
        .all(|l| l.ip_address.as_deref() == Some("192.0.2.10")));
}

#[tokio::test]
async fn jobs_can_be_listed_and_run_by_name() {
    let (_dir, state) = test_state(false).await;
    let identity = Identity::new(1, "root", Role::SuperAdmin);
    let caller = Caller::new(Some(&identity));

    let jobs = admin::list_jobs(&state, caller).await.unwrap();
    let ids: Vec<&str> = jobs["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [job_ids::CLEAN_BACKUPS, job_ids::CREATE_BACKUP]);

    let run = admin::run_job(&state, caller, job_ids::CREATE_BACKUP)
        .await
        .unwrap();
    assert_eq!(run["status"], "completed");
    assert_eq!(run["triggeredBy"], "manual");

    let runs = admin::list_job_runs(&state, caller, Some(job_ids::CREATE_BACKUP), 1, 0)
        .await
        .unwrap();
    assert_eq!(runs["pagination"]["total"], 1);
    assert_eq!(runs["pagination"]["perPage"], 20);

    let beyond = admin::list_job_runs(&state, caller, None, usize::MAX, 50)
        .await
        .unwrap();
    assert!(beyond["items"].as_array().unwrap().is_empty());
    assert_eq!(beyond["pagination"]["total"], 1);

    let err = admin::run_job(&state, caller, job_ids::MODERATE_COMMENTS)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);

    admin::clear_job_runs(&state, caller).await.unwrap();
    assert_eq!(state.scheduler.count_runs(None).await, 0);
}
