use std::sync::Arc;

use uuid::Uuid;

use crate::models::comments::{
    validate_comment, CommentWithAuthor, CreateCommentDto, MAX_COMMENT_CHARS,
};

use super::{visible, BlogApi, ClientError, ClientResult, Notice};

pub const INITIAL_VISIBLE: usize = 5;
pub const MODERATION_NOTICE: &str = "Comment submitted. It will appear once approved.";

/// Approved comments of one post, newest first as served.
pub struct CommentList {
    api: Arc<dyn BlogApi>,
    slug: String,
    comments: Vec<CommentWithAuthor>,
    show_all: bool,
}

impl CommentList {
    pub async fn load(api: Arc<dyn BlogApi>, slug: impl Into<String>) -> ClientResult<Self> {
        let mut list = Self {
            api,
            slug: slug.into(),
            comments: Vec::new(),
            show_all: false,
        };
        list.reload().await?;
        Ok(list)
    }

    pub async fn reload(&mut self) -> ClientResult<()> {
        self.comments = self.api.list_comments(&self.slug).await?;
        Ok(())
    }

    pub fn comments(&self) -> &[CommentWithAuthor] {
        &self.comments
    }

    pub fn visible(&self) -> &[CommentWithAuthor] {
        if self.show_all {
            &self.comments
        } else {
            &self.comments[..self.comments.len().min(INITIAL_VISIBLE)]
        }
    }

    pub fn hidden_count(&self) -> usize {
        self.comments.len() - self.visible().len()
    }

    pub fn show_all(&mut self) {
        self.show_all = true;
    }

    pub fn can_delete(comment: &CommentWithAuthor, viewer: Option<Uuid>) -> bool {
        viewer == Some(comment.comment.author_id)
    }

    /// Deletes one of the viewer's own comments and reloads the list. Other
    /// people's comments are refused before any request is made.
    pub async fn delete(&mut self, comment_id: Uuid, viewer: Option<Uuid>) -> ClientResult<()> {
        if viewer.is_none() {
            return Err(ClientError::Unauthorized(
                "Sign in to manage comments".to_string(),
            ));
        }
        let comment = self
            .comments
            .iter()
            .find(|c| c.comment.id == comment_id)
            .ok_or_else(|| ClientError::NotFound("Comment not found".to_string()))?;
        if !Self::can_delete(comment, viewer) {
            return Err(ClientError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.api.delete_comment(comment_id).await?;
        self.reload().await
    }
}

pub struct CommentForm {
    api: Arc<dyn BlogApi>,
    content: String,
    notice: Option<Notice>,
}

impl CommentForm {
    pub fn new(api: Arc<dyn BlogApi>) -> Self {
        Self {
            api,
            content: String::new(),
            notice: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn remaining_chars(&self) -> isize {
        MAX_COMMENT_CHARS as isize - self.content.trim().chars().count() as isize
    }

    pub fn notice(&self) -> Option<&Notice> {
        visible(&self.notice)
    }

    /// Validates locally, then submits. The new comment is pending, so it is returned
    /// for reference but never added to a [`CommentList`].
    pub async fn submit(
        &mut self,
        slug: &str,
        parent_id: Option<Uuid>,
    ) -> ClientResult<CommentWithAuthor> {
        let content = validate_comment(&self.content)
            .map_err(|msg| ClientError::Validation(msg.to_string()))?
            .to_string();

        match self
            .api
            .create_comment(slug, &CreateCommentDto { content, parent_id })
            .await
        {
            Ok(comment) => {
                self.content.clear();
                self.notice = Some(Notice::success(MODERATION_NOTICE));
                Ok(comment)
            }
            Err(err) => {
                self.notice = Some(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }
}
