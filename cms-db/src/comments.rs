use serde::Serialize;
use sqlx::Executor;

use crate::update::{Column, UpdateSet};
use crate::DbBackend;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentColumn {
    Comment,
    Passed,
}

impl Column for CommentColumn {
    const TABLE: &'static str = "comments";

    fn all() -> &'static [Self] {
        &[CommentColumn::Comment, CommentColumn::Passed]
    }

    fn name(self) -> &'static str {
        match self {
            CommentColumn::Comment => "comment",
            CommentColumn::Passed => "passed",
        }
    }
}

/// Comments currently shown to the public.
pub async fn list_visible<'e, E>(executor: E) -> Result<Vec<CommentRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    sqlx::query_as::<_, CommentRow>("SELECT id, comment FROM comments WHERE passed = 1 ORDER BY id")
        .fetch_all(executor)
        .await
}

/// Marks a comment as not passed.
pub async fn hide<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    UpdateSet::new()
        .set(CommentColumn::Passed, 0_i64)
        .execute(executor, id)
        .await
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::test_support::migrated_pool;

    #[tokio::test]
    async fn hidden_comments_drop_out_of_visible_list() {
        let (_dir, pool) = migrated_pool().await;
        for text in ["lovely vase", "meh"] {
            sqlx::query("INSERT INTO comments (user_id, artifact_id, comment) VALUES (1, 1, ?)")
                .bind(text)
                .execute(&pool)
                .await
                .unwrap();
        }

        let visible = list_visible(&pool).await.unwrap();
        assert_eq!(visible.len(), 2);

        assert_eq!(hide(&pool, visible[1].id).await.unwrap(), 1);
        let visible = list_visible(&pool).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].comment, "lovely vase");
    }
}
