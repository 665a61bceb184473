use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::posts::AuthorRef;

pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "comment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Spam,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<AuthorRef>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CommentRow {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
}

impl From<CommentRow> for CommentWithAuthor {
    fn from(row: CommentRow) -> Self {
        CommentWithAuthor {
            comment: row.comment,
            author: row.author_name.map(|name| AuthorRef {
                name,
                avatar_url: row.author_avatar_url,
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CreateCommentDto {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
}

/// Trims and checks the 1..=1000 character bounds shared by the API and the form.
pub fn validate_comment(content: &str) -> Result<&str, &'static str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("Comment content cannot be empty");
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err("Comment content max 1000 characters");
    }
    Ok(trimmed)
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommentsResponse {
    pub comments: Vec<CommentWithAuthor>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommentResponse {
    pub comment: CommentWithAuthor,
}
