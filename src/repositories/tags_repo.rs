use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    models::{
        posts::{PostSummary, PostSummaryRow},
        tags::{Tag, TagWithCount},
    },
    Error, Result,
};

use super::{PostgresRepo, POST_SUMMARY_SELECT};

#[async_trait]
pub trait TagsRepository: Sync + Send {
    async fn list_tags_with_counts(&self) -> Result<Vec<TagWithCount>>;
    /// Fails with `Error::Conflict` when the slug is taken.
    async fn create_tag(&self, name: &str, slug: &str, color: &str) -> Result<Tag>;
    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>>;
    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>>;
    async fn published_posts_for_tag(&self, tag_id: Uuid) -> Result<Vec<PostSummary>>;
}

#[async_trait]
impl TagsRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn list_tags_with_counts(&self) -> Result<Vec<TagWithCount>> {
        let tags = sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, t.slug, t.color, t.created_at,
                   COUNT(pt.post_id) AS post_count
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            GROUP BY t.id
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn create_tag(&self, name: &str, slug: &str, color: &str) -> Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (id, name, slug, color)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, color, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(slug)
        .bind(color)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match Error::from(err) {
            Error::Conflict(_) => Error::Conflict("Tag already exists".to_string()),
            other => other,
        })?;

        Ok(tag)
    }

    #[instrument(skip(self))]
    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            "SELECT id, name, slug, color, created_at FROM tags WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tag)
    }

    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.slug, t.color, t.created_at
            FROM tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    #[instrument(skip(self))]
    async fn published_posts_for_tag(&self, tag_id: Uuid) -> Result<Vec<PostSummary>> {
        let sql = format!(
            "{POST_SUMMARY_SELECT}
            JOIN post_tags pt ON pt.post_id = p.id
            WHERE pt.tag_id = $1 AND p.status = 'published'
            ORDER BY p.created_at DESC"
        );

        let rows = sqlx::query_as::<_, PostSummaryRow>(&sql)
            .bind(tag_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }
}
