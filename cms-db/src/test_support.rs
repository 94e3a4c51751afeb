use tempfile::TempDir;

use crate::{create_pool, DbConnectionConfig, DbPool};

/// File-backed sqlite database in a scratch directory with the schema applied.
/// The directory must outlive the pool.
pub(crate) async fn migrated_pool() -> (TempDir, DbPool) {
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
