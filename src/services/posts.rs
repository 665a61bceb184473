use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        categories::Category,
        posts::{
            AuthorRef, CreatePostDto, Post, PostDetail, PostListQuery, PostPage, PostStatus,
            PostSummary, RelatedQuery, SearchResponse, UpdatePostDto,
        },
        profiles::Profile,
    },
    repositories::{
        categories_repo::CategoriesRepository,
        posts_repo::{NewPost, PostsRepository},
        profiles_repo::ProfilesRepository,
        tags_repo::TagsRepository,
    },
    utils::slug::slugify,
    Error, Result,
};

pub const POSTS_PER_PAGE: u32 = 10;
pub const SEARCH_RESULT_LIMIT: i64 = 20;
pub const MAX_SEARCH_CHARS: usize = 100;
pub const DEFAULT_RELATED_LIMIT: u32 = 3;
pub const MAX_RELATED_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct PostsService {
    posts: Arc<dyn PostsRepository>,
    tags: Arc<dyn TagsRepository>,
    categories: Arc<dyn CategoriesRepository>,
    profiles: Arc<dyn ProfilesRepository>,
}

impl PostsService {
    pub fn new(
        posts: Arc<dyn PostsRepository>,
        tags: Arc<dyn TagsRepository>,
        categories: Arc<dyn CategoriesRepository>,
        profiles: Arc<dyn ProfilesRepository>,
    ) -> Self {
        Self {
            posts,
            tags,
            categories,
            profiles,
        }
    }

    pub async fn list_page(&self, query: PostListQuery) -> Result<PostPage> {
        let page = query.page.unwrap_or(1).max(1);
        let category = query.category.as_deref().filter(|c| !c.is_empty());

        let limit = i64::from(POSTS_PER_PAGE);
        let offset = i64::from(page - 1) * limit;
        let posts = self.posts.list_published(category, limit, offset).await?;
        let total = self.posts.count_published(category).await?;

        Ok(PostPage {
            posts,
            page,
            total_pages: total_pages(total),
        })
    }

    /// Published post by slug, counting the read.
    pub async fn get_by_slug(&self, slug: &str) -> Result<PostDetail> {
        let mut post = self
            .posts
            .find_published_by_slug(slug)
            .await?
            .ok_or(Error::NotFound)?;

        self.posts.increment_views(post.id).await?;
        post.view_count += 1;

        self.detail(post).await
    }

    pub async fn detail(&self, post: Post) -> Result<PostDetail> {
        let author = self
            .profiles
            .find_profile(post.author_id)
            .await?
            .map(|p| AuthorRef {
                name: p.name,
                avatar_url: p.avatar_url,
            });
        let category = match post.category_id {
            Some(id) => self.categories.find_category(id).await?,
            None => None,
        };
        let tags = self.tags.tags_for_post(post.id).await?;

        Ok(PostDetail {
            post,
            author,
            category,
            tags,
        })
    }

    pub async fn create(&self, author: &Profile, dto: CreatePostDto) -> Result<PostDetail> {
        dto.validate()?;

        let title = dto.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::BadRequest("Title is required".to_string()));
        }
        let slug = match dto.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => normalize_slug(slug)?,
            _ => normalize_slug(&title)?,
        };
        if dto.status == PostStatus::Published {
            ensure_publishable(&title, &dto.content)?;
        }

        let post = self
            .posts
            .create_post(
                author.id,
                NewPost {
                    title,
                    slug,
                    content: dto.content,
                    excerpt: dto.excerpt,
                    cover_image: dto.cover_image,
                    status: dto.status,
                    category_id: dto.category_id,
                },
            )
            .await?;

        if !dto.tag_ids.is_empty() {
            let tagged = self
                .posts
                .set_post_tags(post.id, &dedup_ids(&dto.tag_ids))
                .await;
            if let Err(err) = tagged {
                self.posts.delete_post(post.id).await?;
                return Err(err);
            }
        }

        info!(post_id = %post.id, status = post.status.to_str(), "post created");
        self.detail(post).await
    }

    /// Applies only the fields present in `dto`; publishing is validated against the
    /// merged post.
    pub async fn update(
        &self,
        caller: &Profile,
        post_id: Uuid,
        dto: UpdatePostDto,
    ) -> Result<PostDetail> {
        dto.validate()?;
        let mut dto = dto;
        if let Some(title) = dto.title.take() {
            let title = title.trim();
            if title.is_empty() {
                return Err(Error::BadRequest("Title is required".to_string()));
            }
            dto.title = Some(title.to_string());
        }
        if let Some(slug) = dto.slug.take() {
            dto.slug = Some(normalize_slug(&slug)?);
        }

        let mut post = self.owned_post(caller, post_id).await?;
        dto.apply_to(&mut post);
        if post.status == PostStatus::Published {
            ensure_publishable(&post.title, &post.content)?;
        }

        let post = self.posts.update_post(&post).await?;
        if let Some(tag_ids) = &dto.tag_ids {
            self.posts.set_post_tags(post.id, &dedup_ids(tag_ids)).await?;
        }

        self.detail(post).await
    }

    pub async fn delete(&self, caller: &Profile, post_id: Uuid) -> Result<()> {
        self.owned_post(caller, post_id).await?;
        self.posts.delete_post(post_id).await?;

        info!(%post_id, "post deleted");
        Ok(())
    }

    pub async fn search(&self, raw_query: Option<&str>) -> Result<SearchResponse> {
        let query = raw_query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Err(Error::BadRequest("Search query is required".to_string()));
        }
        if query.chars().count() > MAX_SEARCH_CHARS {
            return Err(Error::BadRequest(
                "Search query must be at most 100 characters".to_string(),
            ));
        }

        let posts = self
            .posts
            .search_published(query, SEARCH_RESULT_LIMIT)
            .await?;

        Ok(SearchResponse {
            count: posts.len(),
            query: query.to_string(),
            posts,
        })
    }

    pub async fn related(&self, query: RelatedQuery) -> Result<Vec<PostSummary>> {
        let tag_names: Vec<String> = query
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tag_names.is_empty() {
            return Ok(Vec::new());
        }

        let limit = query
            .limit
            .unwrap_or(DEFAULT_RELATED_LIMIT)
            .clamp(1, MAX_RELATED_LIMIT);

        self.posts
            .related_published(&tag_names, query.exclude, i64::from(limit))
            .await
    }

    /// Every post the caller authored, drafts included.
    pub async fn list_for_author(&self, author: &Profile) -> Result<Vec<Post>> {
        self.posts.list_by_author(author.id).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.categories.list_categories().await
    }

    async fn owned_post(&self, caller: &Profile, post_id: Uuid) -> Result<Post> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(Error::NotFound)?;

        if post.author_id != caller.id {
            return Err(Error::Forbidden);
        }
        Ok(post)
    }
}

fn total_pages(total: i64) -> u32 {
    let per_page = i64::from(POSTS_PER_PAGE);
    ((total.max(0) + per_page - 1) / per_page) as u32
}

/// Slugifies a title or a hand-typed slug; nothing URL-safe left is a 400.
fn normalize_slug(raw: &str) -> Result<String> {
    let slug = slugify(raw);
    if slug.trim_matches('-').is_empty() {
        return Err(Error::BadRequest(
            "Slug cannot be empty; use letters or digits".to_string(),
        ));
    }
    Ok(slug)
}

fn ensure_publishable(title: &str, content: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::BadRequest("A published post needs a title".to_string()));
    }
    if content.trim().is_empty() {
        return Err(Error::BadRequest("A published post needs content".to_string()));
    }
    Ok(())
}

fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(10), 1);
        assert_eq!(total_pages(11), 2);
    }

    #[test]
    fn publishing_requires_title_and_content() {
        assert!(ensure_publishable("Title", "Body").is_ok());
        assert!(ensure_publishable("  ", "Body").is_err());
        assert!(ensure_publishable("Title", "\n\t").is_err());
    }

    #[test]
    fn slugs_are_trimmed_and_slugified() {
        assert_eq!(normalize_slug("  My Slug  ").unwrap(), "my-slug");
        assert_eq!(normalize_slug("already-fine").unwrap(), "already-fine");
        assert!(normalize_slug("   ").is_err());
        assert!(normalize_slug(" - ").is_err());
        assert!(normalize_slug("?!").is_err());
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(dedup_ids(&[a, b, a, b]), vec![a, b]);
    }
}
