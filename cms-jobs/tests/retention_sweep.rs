#![cfg(feature = "sqlite")]

mod common;

use chrono::Duration;
use cms_db::backup_records;
use cms_jobs::RetentionSweeper;

use common::{migrated_pool, seed_backup};

#[tokio::test]
async fn only_aged_automatic_backups_are_removed() {
    let (dir, pool) = migrated_pool().await;
    let now = cms_db::now_local();
    let ago = |days| now - Duration::days(days);

    let (old_a, old_a_path) = seed_backup(&pool, dir.path(), "a45.sql", "auto", ago(45)).await;
    let (old_b, old_b_path) = seed_backup(&pool, dir.path(), "a40.sql", "auto", ago(40)).await;
    let (fresh, fresh_path) = seed_backup(&pool, dir.path(), "a10.sql", "auto", ago(10)).await;
    let (manual, manual_path) = seed_backup(&pool, dir.path(), "m45.sql", "manual", ago(45)).await;

    let removed = RetentionSweeper::new(pool.clone())
        .sweep(30, now)
        .await
        .expect("sweep");

    assert_eq!(removed, 2);
    for id in [old_a, old_b] {
        assert!(backup_records::find_by_id(&pool, id).await.unwrap().is_none());
    }
    for id in [fresh, manual] {
        assert!(backup_records::find_by_id(&pool, id).await.unwrap().is_some());
    }
    assert!(!old_a_path.exists() && !old_b_path.exists());
    assert!(fresh_path.exists() && manual_path.exists());
}

#[tokio::test]
async fn missing_artifacts_do_not_block_record_removal() {
    let (dir, pool) = migrated_pool().await;
    let now = cms_db::now_local();
    let (_, path) = seed_backup(&pool, dir.path(), "gone.sql", "auto", now - Duration::days(60)).await;
    std::fs::remove_file(path).unwrap();

    let removed = RetentionSweeper::new(pool.clone()).sweep(30, now).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(backup_records::count(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn one_unremovable_artifact_does_not_abort_the_sweep() {
    let (dir, pool) = migrated_pool().await;
    let now = cms_db::now_local();
    // a directory at the artifact path makes remove_file fail with something other than NotFound
    let (stuck, stuck_path) = seed_backup(&pool, dir.path(), "stuck.sql", "auto", now - Duration::days(50)).await;
    std::fs::remove_file(&stuck_path).unwrap();
    std::fs::create_dir(&stuck_path).unwrap();
    let (other, _) = seed_backup(&pool, dir.path(), "other.sql", "auto", now - Duration::days(40)).await;

    let removed = RetentionSweeper::new(pool.clone()).sweep(30, now).await.unwrap();

    assert_eq!(removed, 1);
    assert!(backup_records::find_by_id(&pool, stuck).await.unwrap().is_some());
    assert!(backup_records::find_by_id(&pool, other).await.unwrap().is_none());
}

#[tokio::test]
async fn sweeping_an_empty_store_removes_nothing() {
    let (_dir, pool) = migrated_pool().await;
    let removed = RetentionSweeper::new(pool)
        .sweep(30, cms_db::now_local())
        .await
        .unwrap();
    assert_eq!(removed, 0);
}
