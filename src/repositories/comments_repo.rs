use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    models::comments::{Comment, CommentRow, CommentWithAuthor},
    Result,
};

use super::PostgresRepo;

const COMMENT_WITH_AUTHOR_SELECT: &str = r#"
    SELECT cm.id, cm.content, cm.post_id, cm.author_id, cm.parent_id, cm.status, cm.created_at,
           pr.name AS author_name, pr.avatar_url AS author_avatar_url
    FROM comments cm
    LEFT JOIN profiles pr ON pr.id = cm.author_id
"#;

#[async_trait]
pub trait CommentsRepository: Sync + Send {
    /// Approved comments only, newest first.
    async fn approved_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>>;
    /// Always stored as `pending`.
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Comment>;
    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<CommentWithAuthor>>;
    async fn delete_comment(&self, comment_id: Uuid) -> Result<()>;
}

#[async_trait]
impl CommentsRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn approved_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let sql = format!(
            "{COMMENT_WITH_AUTHOR_SELECT}
            WHERE cm.post_id = $1 AND cm.status = 'approved'
            ORDER BY cm.created_at DESC"
        );

        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CommentWithAuthor::from).collect())
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, content, post_id, author_id, parent_id, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING id, content, post_id, author_id, parent_id, status, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(content)
        .bind(post_id)
        .bind(author_id)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    #[instrument(skip(self))]
    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<CommentWithAuthor>> {
        let sql = format!("{COMMENT_WITH_AUTHOR_SELECT} WHERE cm.id = $1");

        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CommentWithAuthor::from))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
