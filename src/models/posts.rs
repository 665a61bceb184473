use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{categories::Category, double_option, tags::Tag};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "post_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn to_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub status: PostStatus,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AuthorRef {
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

/// Listing/search shape of a post: no body, joined author and category.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: Option<AuthorRef>,
    pub category: Option<CategoryRef>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PostSummaryRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
}

impl From<PostSummaryRow> for PostSummary {
    fn from(row: PostSummaryRow) -> Self {
        let author = row.author_name.map(|name| AuthorRef {
            name,
            avatar_url: row.author_avatar_url,
        });
        let category = match (row.category_name, row.category_slug) {
            (Some(name), Some(slug)) => Some(CategoryRef { name, slug }),
            _ => None,
        };

        PostSummary {
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            cover_image: row.cover_image,
            created_at: row.created_at,
            author,
            category,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<AuthorRef>,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate, Default)]
pub struct CreatePostDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 100, message = "Slug must be at most 100 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

/// Partial update. Absent fields are left untouched; nullable fields accept an
/// explicit `null` to clear them.
#[derive(Debug, Deserialize, Serialize, Clone, Validate, Default, PartialEq)]
pub struct UpdatePostDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Slug must be between 1 and 100 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub excerpt: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cover_image: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<Uuid>>,
}

impl UpdatePostDto {
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Applies the set fields onto `post` (tags are handled separately).
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            post.slug = slug.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            post.excerpt = excerpt.clone();
        }
        if let Some(cover_image) = &self.cover_image {
            post.cover_image = cover_image.clone();
        }
        if let Some(status) = self.status {
            post.status = status;
        }
        if let Some(category_id) = self.category_id {
            post.category_id = category_id;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PostListQuery {
    pub page: Option<u32>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PostPage {
    pub posts: Vec<PostSummary>,
    pub page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchResponse {
    pub posts: Vec<PostSummary>,
    pub query: String,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub tags: Option<String>,
    pub exclude: Option<Uuid>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PostsResponse {
    pub posts: Vec<PostSummary>,
}
