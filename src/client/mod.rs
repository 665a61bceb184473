//! Authoring and reading components, independent of any UI toolkit.
//!
//! Each component is a plain state struct plus, where timers or network calls are
//! involved, a small driver that owns the `Arc<dyn BlogApi>` handle. Drivers never
//! hold a component lock while a request is in flight; request sequence numbers
//! decide which responses still apply.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::{
    comments::{CommentWithAuthor, CreateCommentDto},
    posts::{CreatePostDto, PostDetail, SearchResponse, UpdatePostDto},
    tags::{CreateTagDto, Tag, TagWithCount},
    upload::{UploadKind, UploadResponse},
};

pub mod comments;
pub mod delete_post;
pub mod editor;
pub mod http;
pub mod image_upload;
pub mod local_store;
pub mod pagination;
pub mod search_box;
pub mod tag_manager;

/// How long success/error notices stay visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

pub type ClientResult<T> = core::result::Result<T, ClientError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("{0}")]
    Server(String),
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Local storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Maps a non-success HTTP status and its `{"error"}` message.
    pub fn from_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match status {
            400 | 413 | 422 => Self::Validation(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            429 => Self::RateLimited {
                message,
                retry_after,
            },
            _ => Self::Server(message),
        }
    }
}

/// The first-party API as the components see it.
#[async_trait]
pub trait BlogApi: Send + Sync {
    async fn search_posts(&self, query: &str) -> ClientResult<SearchResponse>;
    async fn create_post(&self, post: &CreatePostDto) -> ClientResult<PostDetail>;
    async fn update_post(
        &self,
        post_id: Uuid,
        update: &UpdatePostDto,
    ) -> ClientResult<PostDetail>;
    async fn delete_post(&self, post_id: Uuid) -> ClientResult<()>;
    async fn list_tags(&self) -> ClientResult<Vec<TagWithCount>>;
    async fn create_tag(&self, tag: &CreateTagDto) -> ClientResult<Tag>;
    async fn list_comments(&self, slug: &str) -> ClientResult<Vec<CommentWithAuthor>>;
    async fn create_comment(
        &self,
        slug: &str,
        comment: &CreateCommentDto,
    ) -> ClientResult<CommentWithAuthor>;
    async fn delete_comment(&self, comment_id: Uuid) -> ClientResult<()>;
    async fn upload_image(&self, kind: UploadKind, bytes: &[u8]) -> ClientResult<UploadResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient message; hidden once `expires_at` passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    expires_at: Instant,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            expires_at: Instant::now() + NOTICE_TTL,
        }
    }

    pub fn is_visible(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Returns the notice in `slot` while it is still visible.
pub(crate) fn visible(slot: &Option<Notice>) -> Option<&Notice> {
    slot.as_ref().filter(|n| n.is_visible())
}
