use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    models::posts::{Post, PostStatus, PostSummary, PostSummaryRow},
    Error, Result,
};

use super::{like_pattern, PostgresRepo, POST_SUMMARY_SELECT};

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, cover_image, status, author_id, \
                            category_id, view_count, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub status: PostStatus,
    pub category_id: Option<Uuid>,
}

#[async_trait]
pub trait PostsRepository: Sync + Send {
    async fn list_published(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostSummary>>;
    async fn count_published(&self, category: Option<&str>) -> Result<i64>;
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>>;
    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>>;
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Post>>;
    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post>;
    /// Writes every editable column of `post` and bumps `updated_at`.
    async fn update_post(&self, post: &Post) -> Result<Post>;
    async fn delete_post(&self, post_id: Uuid) -> Result<()>;
    async fn search_published(&self, query: &str, limit: i64) -> Result<Vec<PostSummary>>;
    async fn related_published(
        &self,
        tag_names: &[String],
        exclude: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<PostSummary>>;
    async fn increment_views(&self, post_id: Uuid) -> Result<()>;
    /// Replaces the post's tag set.
    async fn set_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<()>;
}

fn map_reference_error(err: sqlx::Error) -> Error {
    if err
        .as_database_error()
        .is_some_and(|db_err| db_err.is_foreign_key_violation())
    {
        return Error::BadRequest("Unknown category or tag".to_string());
    }
    Error::from(err)
}

#[async_trait]
impl PostsRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn list_published(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostSummary>> {
        let sql = format!(
            "{POST_SUMMARY_SELECT}
            WHERE p.status = 'published' AND ($1::text IS NULL OR c.slug = $1)
            ORDER BY p.created_at DESC
            LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, PostSummaryRow>(&sql)
            .bind(category)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    async fn count_published(&self, category: Option<&str>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM posts p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'published' AND ($1::text IS NULL OR c.slug = $1)
            "#,
        )
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = $1 ORDER BY created_at DESC"
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    #[instrument(skip(self))]
    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    #[instrument(skip(self))]
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1 AND status = 'published'"
        );
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post> {
        let sql = format!(
            "INSERT INTO posts (id, title, slug, content, excerpt, cover_image, status, author_id, category_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {POST_COLUMNS}"
        );

        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::now_v7())
            .bind(post.title)
            .bind(post.slug)
            .bind(post.content)
            .bind(post.excerpt)
            .bind(post.cover_image)
            .bind(post.status)
            .bind(author_id)
            .bind(post.category_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_reference_error)?;

        Ok(post)
    }

    async fn update_post(&self, post: &Post) -> Result<Post> {
        let sql = format!(
            "UPDATE posts
             SET title = $2, slug = $3, content = $4, excerpt = $5, cover_image = $6,
                 status = $7, category_id = $8, updated_at = NOW()
             WHERE id = $1
             RETURNING {POST_COLUMNS}"
        );

        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post.id)
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.content)
            .bind(&post.excerpt)
            .bind(&post.cover_image)
            .bind(post.status)
            .bind(post.category_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_reference_error)?;

        Ok(post)
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_published(&self, query: &str, limit: i64) -> Result<Vec<PostSummary>> {
        let sql = format!(
            "{POST_SUMMARY_SELECT}
            WHERE p.status = 'published'
              AND (p.title ILIKE $1 OR p.content ILIKE $1 OR p.excerpt ILIKE $1)
            ORDER BY p.created_at DESC
            LIMIT $2"
        );

        let rows = sqlx::query_as::<_, PostSummaryRow>(&sql)
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    #[instrument(skip(self))]
    async fn related_published(
        &self,
        tag_names: &[String],
        exclude: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<PostSummary>> {
        let lowered: Vec<String> = tag_names.iter().map(|t| t.to_lowercase()).collect();
        let sql = format!(
            "{POST_SUMMARY_SELECT}
            WHERE p.status = 'published'
              AND ($2::uuid IS NULL OR p.id <> $2)
              AND EXISTS (
                  SELECT 1 FROM post_tags pt
                  JOIN tags t ON t.id = pt.tag_id
                  WHERE pt.post_id = p.id AND LOWER(t.name) = ANY($1)
              )
            ORDER BY p.created_at DESC
            LIMIT $3"
        );

        let rows = sqlx::query_as::<_, PostSummaryRow>(&sql)
            .bind(&lowered)
            .bind(exclude)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    async fn increment_views(&self, post_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO post_tags (post_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS tag_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(tag_ids)
        .execute(&mut *tx)
        .await
        .map_err(map_reference_error)?;

        tx.commit().await?;
        Ok(())
    }
}
