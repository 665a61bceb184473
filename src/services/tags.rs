use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::{
    models::tags::{CreateTagDto, Tag, TagPosts, TagWithCount, DEFAULT_TAG_COLOR},
    repositories::tags_repo::TagsRepository,
    utils::slug::slugify,
    Error, Result,
};

#[derive(Clone)]
pub struct TagsService {
    tags: Arc<dyn TagsRepository>,
}

impl TagsService {
    pub fn new(tags: Arc<dyn TagsRepository>) -> Self {
        Self { tags }
    }

    pub async fn list(&self) -> Result<Vec<TagWithCount>> {
        self.tags.list_tags_with_counts().await
    }

    /// Creates a tag whose slug is derived from the name. A second tag with the same
    /// slug is a `Conflict`.
    pub async fn create(&self, mut dto: CreateTagDto) -> Result<Tag> {
        dto.name = dto.name.trim().to_string();
        dto.validate()?;

        let slug = slugify(&dto.name);
        if slug.is_empty() {
            return Err(Error::BadRequest(
                "Tag name must contain letters or digits".to_string(),
            ));
        }
        let color = dto.color.as_deref().unwrap_or(DEFAULT_TAG_COLOR);

        let tag = self.tags.create_tag(&dto.name, &slug, color).await?;
        info!(tag = %tag.slug, "tag created");
        Ok(tag)
    }

    pub async fn posts_for_tag(&self, slug: &str) -> Result<TagPosts> {
        let tag = self
            .tags
            .find_tag_by_slug(slug)
            .await?
            .ok_or(Error::NotFound)?;
        let posts = self.tags.published_posts_for_tag(tag.id).await?;

        Ok(TagPosts { tag, posts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryRepo;

    fn dto(name: &str, color: Option<&str>) -> CreateTagDto {
        CreateTagDto {
            name: name.to_string(),
            color: color.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn defaults_color_and_derives_slug() {
        let service = TagsService::new(Arc::new(MemoryRepo::new()));

        let tag = service.create(dto("  Rust Async ", None)).await.unwrap();
        assert_eq!(tag.name, "Rust Async");
        assert_eq!(tag.slug, "rust-async");
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);
    }

    #[tokio::test]
    async fn same_slug_conflicts() {
        let service = TagsService::new(Arc::new(MemoryRepo::new()));

        service.create(dto("Rust", Some("#FF0000"))).await.unwrap();
        let err = service.create(dto("rust", None)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn rejects_bad_names_and_colors() {
        let service = TagsService::new(Arc::new(MemoryRepo::new()));

        assert!(matches!(service.create(dto("   ", None)).await, Err(Error::BadRequest(_))));
        assert!(matches!(service.create(dto("!!!", None)).await, Err(Error::BadRequest(_))));
        assert!(matches!(
            service.create(dto("x".repeat(51).as_str(), None)).await,
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            service.create(dto("Go", Some("blue"))).await,
            Err(Error::BadRequest(_))
        ));
    }
}
