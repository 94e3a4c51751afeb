#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use cms_db::backup_records::{self, NewBackupRecord};
use cms_db::{create_pool, DbConnectionConfig, DbPool};
use async_trait::async_trait;
use cms_dump_client::{DumpClient, DumpError};
use tempfile::TempDir;

pub const DUMP_BODY: &str = "CREATE TABLE comments (id INTEGER);\n";

pub async fn migrated_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("cms.sqlite").display());
    let pool = create_pool(&DbConnectionConfig::new(url))
        .await
        .expect("create pool");
    cms_migrations::sqlite_migrator()
        .run(&pool)
        .await
        .expect("run migrations");
    (dir, pool)
}

/// In-process stand-in for the dump tools.
#[derive(Default)]
pub struct FakeDumpClient {
    fail_dump: AtomicBool,
    refuse_dump: AtomicBool,
    fail_restore: AtomicBool,
    pub dumped_tables: Mutex<Vec<String>>,
    pub restored: Mutex<Vec<PathBuf>>,
}

impl FakeDumpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_dump() -> Arc<Self> {
        let client = Self::default();
        client.fail_dump.store(true, Ordering::SeqCst);
        Arc::new(client)
    }

    /// Fails before touching the destination, like a tool that cannot connect.
    pub fn refusing_dump() -> Arc<Self> {
        let client = Self::default();
        client.refuse_dump.store(true, Ordering::SeqCst);
        Arc::new(client)
    }

    pub fn set_fail_restore(&self, fail: bool) {
        self.fail_restore.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DumpClient for FakeDumpClient {
    async fn dump(&self, tables: &[&str], dest: &Path) -> Result<(), DumpError> {
        *self.dumped_tables.lock().unwrap() = tables.iter().map(|t| t.to_string()).collect();
        if self.refuse_dump.load(Ordering::SeqCst) {
            return Err(DumpError::Io(io::Error::other("mysqldump: connection refused")));
        }
        // leave a partial file behind, like an interrupted tool would
        tokio::fs::write(dest, DUMP_BODY).await?;
        if self.fail_dump.load(Ordering::SeqCst) {
            return Err(DumpError::Io(io::Error::other("mysqldump: access denied")));
        }
        Ok(())
    }

    async fn restore(&self, src: &Path) -> Result<(), DumpError> {
        if self.fail_restore.load(Ordering::SeqCst) {
            return Err(DumpError::Io(io::Error::other("mysql: syntax error")));
        }
        self.restored.lock().unwrap().push(src.to_path_buf());
        Ok(())
    }
}

/// Inserts a record directly, with an artifact file under `dir`.
pub async fn seed_backup(
    pool: &DbPool,
    dir: &Path,
    name: &str,
    kind: &str,
    time: NaiveDateTime,
) -> (i64, PathBuf) {
    let path = dir.join(name);
    std::fs::write(&path, DUMP_BODY).expect("write artifact");
    let path_text = path.to_string_lossy();
    let id = backup_records::insert(
        pool,
        &NewBackupRecord {
            backup_name: name,
            backup_path: &path_text,
            backup_size: DUMP_BODY.len() as i64,
            backup_time: time,
            backup_type: kind,
            status: "success",
            description: "",
        },
    )
    .await
    .expect("insert record");
    (id, path)
}

pub async fn seed_comment(pool: &DbPool, text: &str, passed: i64) -> i64 {
    let result = sqlx::query("INSERT INTO comments (user_id, artifact_id, comment, passed) VALUES (1, 1, ?, ?)")
        .bind(text)
        .bind(passed)
        .execute(pool)
        .await
        .expect("insert comment");
    result.last_insert_rowid()
}

pub async fn comment_passed(pool: &DbPool, id: i64) -> i64 {
    sqlx::query_scalar("SELECT passed FROM comments WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("select comment")
}
