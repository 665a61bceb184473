//! In-process implementation of every repository trait.
//!
//! Backs the integration tests and lets the API run without a database. Unique
//! slugs and foreign keys are enforced the same way the Postgres schema does.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    models::{
        categories::Category,
        comments::{Comment, CommentStatus, CommentWithAuthor},
        posts::{AuthorRef, CategoryRef, Post, PostStatus, PostSummary},
        profiles::{Profile, UserRole},
        tags::{Tag, TagWithCount},
    },
    Error, Result,
};

use super::{
    categories_repo::CategoriesRepository,
    comments_repo::CommentsRepository,
    posts_repo::{NewPost, PostsRepository},
    profiles_repo::ProfilesRepository,
    tags_repo::TagsRepository,
};

#[derive(Default)]
struct Tables {
    posts: Vec<Post>,
    tags: Vec<Tag>,
    post_tags: Vec<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    categories: Vec<Category>,
    profiles: Vec<Profile>,
}

impl Tables {
    fn author_ref(&self, author_id: Uuid) -> Option<AuthorRef> {
        self.profiles
            .iter()
            .find(|p| p.id == author_id)
            .map(|p| AuthorRef {
                name: p.name.clone(),
                avatar_url: p.avatar_url.clone(),
            })
    }

    fn summary(&self, post: &Post) -> PostSummary {
        let category = post
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id))
            .map(|c| CategoryRef {
                name: c.name.clone(),
                slug: c.slug.clone(),
            });

        PostSummary {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            excerpt: post.excerpt.clone(),
            cover_image: post.cover_image.clone(),
            created_at: post.created_at,
            author: self.author_ref(post.author_id),
            category,
        }
    }

    /// Published posts matching `filter`, newest first.
    fn published<F>(&self, filter: F) -> Vec<&Post>
    where
        F: Fn(&Post) -> bool,
    {
        let mut posts: Vec<&Post> = self
            .posts
            .iter()
            .filter(|p| p.status == PostStatus::Published && filter(p))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    fn in_category(&self, post: &Post, category: Option<&str>) -> bool {
        match category {
            None => true,
            Some(slug) => post
                .category_id
                .and_then(|id| self.categories.iter().find(|c| c.id == id))
                .is_some_and(|c| c.slug == slug),
        }
    }

    fn check_references(&self, category_id: Option<Uuid>) -> Result<()> {
        if let Some(id) = category_id {
            if !self.categories.iter().any(|c| c.id == id) {
                return Err(Error::BadRequest("Unknown category or tag".to_string()));
            }
        }
        Ok(())
    }

    fn check_unique_slug(&self, slug: &str, except: Option<Uuid>) -> Result<()> {
        if self
            .posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != except)
        {
            return Err(Error::Conflict("Resource already exists".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRepo {
    tables: RwLock<Tables>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_profile(&self, name: &str, role: UserRole) -> Profile {
        let profile = Profile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            avatar_url: None,
            role,
            created_at: Utc::now(),
        };
        self.write().profiles.push(profile.clone());
        profile
    }

    pub fn add_category(&self, name: &str, slug: &str) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: None,
            created_at: Utc::now(),
        };
        self.write().categories.push(category.clone());
        category
    }

    /// Moderation happens in the backend's own tooling; exposed here for seeding.
    pub fn set_comment_status(&self, comment_id: Uuid, status: CommentStatus) -> bool {
        let mut tables = self.write();
        match tables.comments.iter_mut().find(|c| c.id == comment_id) {
            Some(comment) => {
                comment.status = status;
                true
            }
            None => false,
        }
    }

    pub fn set_post_created_at(&self, post_id: Uuid, created_at: DateTime<Utc>) {
        if let Some(post) = self.write().posts.iter_mut().find(|p| p.id == post_id) {
            post.created_at = created_at;
        }
    }

    pub fn set_comment_created_at(&self, comment_id: Uuid, created_at: DateTime<Utc>) {
        if let Some(comment) = self.write().comments.iter_mut().find(|c| c.id == comment_id) {
            comment.created_at = created_at;
        }
    }
}

#[async_trait]
impl PostsRepository for MemoryRepo {
    async fn list_published(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostSummary>> {
        let tables = self.read();
        let posts = tables
            .published(|p| tables.in_category(p, category))
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|p| tables.summary(p))
            .collect();
        Ok(posts)
    }

    async fn count_published(&self, category: Option<&str>) -> Result<i64> {
        let tables = self.read();
        Ok(tables.published(|p| tables.in_category(p, category)).len() as i64)
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .read()
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.read().posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        Ok(self
            .read()
            .posts
            .iter()
            .find(|p| p.slug == slug && p.status == PostStatus::Published)
            .cloned())
    }

    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post> {
        let mut tables = self.write();
        tables.check_unique_slug(&post.slug, None)?;
        tables.check_references(post.category_id)?;

        let now = Utc::now();
        let post = Post {
            id: Uuid::now_v7(),
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            cover_image: post.cover_image,
            status: post.status,
            author_id,
            category_id: post.category_id,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, post: &Post) -> Result<Post> {
        let mut tables = self.write();
        tables.check_unique_slug(&post.slug, Some(post.id))?;
        tables.check_references(post.category_id)?;

        let stored = tables
            .posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or(Error::NotFound)?;
        stored.title = post.title.clone();
        stored.slug = post.slug.clone();
        stored.content = post.content.clone();
        stored.excerpt = post.excerpt.clone();
        stored.cover_image = post.cover_image.clone();
        stored.status = post.status;
        stored.category_id = post.category_id;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let mut tables = self.write();
        tables.posts.retain(|p| p.id != post_id);
        tables.post_tags.retain(|(p, _)| *p != post_id);
        tables.comments.retain(|c| c.post_id != post_id);
        Ok(())
    }

    async fn search_published(&self, query: &str, limit: i64) -> Result<Vec<PostSummary>> {
        let needle = query.to_lowercase();
        let matches = |text: &str| text.to_lowercase().contains(&needle);

        let tables = self.read();
        let posts = tables
            .published(|p| {
                matches(&p.title)
                    || matches(&p.content)
                    || p.excerpt.as_deref().is_some_and(matches)
            })
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|p| tables.summary(p))
            .collect();
        Ok(posts)
    }

    async fn related_published(
        &self,
        tag_names: &[String],
        exclude: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<PostSummary>> {
        let tables = self.read();
        let wanted: Vec<Uuid> = tables
            .tags
            .iter()
            .filter(|t| tag_names.iter().any(|n| n.eq_ignore_ascii_case(&t.name)))
            .map(|t| t.id)
            .collect();

        let posts = tables
            .published(|p| {
                Some(p.id) != exclude
                    && tables
                        .post_tags
                        .iter()
                        .any(|(post_id, tag_id)| *post_id == p.id && wanted.contains(tag_id))
            })
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|p| tables.summary(p))
            .collect();
        Ok(posts)
    }

    async fn increment_views(&self, post_id: Uuid) -> Result<()> {
        if let Some(post) = self.write().posts.iter_mut().find(|p| p.id == post_id) {
            post.view_count += 1;
        }
        Ok(())
    }

    async fn set_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
        let mut tables = self.write();
        if tag_ids.iter().any(|id| !tables.tags.iter().any(|t| t.id == *id)) {
            return Err(Error::BadRequest("Unknown category or tag".to_string()));
        }

        tables.post_tags.retain(|(p, _)| *p != post_id);
        for tag_id in tag_ids {
            if !tables.post_tags.contains(&(post_id, *tag_id)) {
                tables.post_tags.push((post_id, *tag_id));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TagsRepository for MemoryRepo {
    async fn list_tags_with_counts(&self) -> Result<Vec<TagWithCount>> {
        let tables = self.read();
        let mut tags: Vec<TagWithCount> = tables
            .tags
            .iter()
            .map(|tag| TagWithCount {
                tag: tag.clone(),
                post_count: tables
                    .post_tags
                    .iter()
                    .filter(|(_, tag_id)| *tag_id == tag.id)
                    .count() as i64,
            })
            .collect();
        tags.sort_by(|a, b| a.tag.name.cmp(&b.tag.name));
        Ok(tags)
    }

    async fn create_tag(&self, name: &str, slug: &str, color: &str) -> Result<Tag> {
        let mut tables = self.write();
        if tables.tags.iter().any(|t| t.slug == slug) {
            return Err(Error::Conflict("Tag already exists".to_string()));
        }

        let tag = Tag {
            id: Uuid::now_v7(),
            name: name.to_string(),
            slug: slug.to_string(),
            color: color.to_string(),
            created_at: Utc::now(),
        };
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        Ok(self.read().tags.iter().find(|t| t.slug == slug).cloned())
    }

    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>> {
        let tables = self.read();
        let mut tags: Vec<Tag> = tables
            .tags
            .iter()
            .filter(|t| tables.post_tags.contains(&(post_id, t.id)))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn published_posts_for_tag(&self, tag_id: Uuid) -> Result<Vec<PostSummary>> {
        let tables = self.read();
        let posts = tables
            .published(|p| tables.post_tags.contains(&(p.id, tag_id)))
            .into_iter()
            .map(|p| tables.summary(p))
            .collect();
        Ok(posts)
    }
}

#[async_trait]
impl CommentsRepository for MemoryRepo {
    async fn approved_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let tables = self.read();
        let mut comments: Vec<CommentWithAuthor> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.status == CommentStatus::Approved)
            .map(|c| CommentWithAuthor {
                comment: c.clone(),
                author: tables.author_ref(c.author_id),
            })
            .collect();
        comments.sort_by(|a, b| b.comment.created_at.cmp(&a.comment.created_at));
        Ok(comments)
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Comment> {
        let mut tables = self.write();
        if let Some(parent_id) = parent_id {
            if !tables.comments.iter().any(|c| c.id == parent_id) {
                return Err(Error::BadRequest("Unknown parent comment".to_string()));
            }
        }

        let comment = Comment {
            id: Uuid::now_v7(),
            content: content.to_string(),
            post_id,
            author_id,
            parent_id,
            status: CommentStatus::Pending,
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<CommentWithAuthor>> {
        let tables = self.read();
        Ok(tables
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .map(|c| CommentWithAuthor {
                comment: c.clone(),
                author: tables.author_ref(c.author_id),
            }))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        let mut tables = self.write();
        tables
            .comments
            .retain(|c| c.id != comment_id && c.parent_id != Some(comment_id));
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepository for MemoryRepo {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.read().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(&self, category_id: Uuid) -> Result<Option<Category>> {
        Ok(self
            .read()
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .cloned())
    }
}

#[async_trait]
impl ProfilesRepository for MemoryRepo {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        Ok(self.read().profiles.iter().find(|p| p.id == user_id).cloned())
    }
}
