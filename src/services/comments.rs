use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    models::{
        comments::{validate_comment, CommentWithAuthor, CreateCommentDto},
        posts::AuthorRef,
        profiles::Profile,
    },
    repositories::{comments_repo::CommentsRepository, posts_repo::PostsRepository},
    Error, Result,
};

#[derive(Clone)]
pub struct CommentsService {
    comments: Arc<dyn CommentsRepository>,
    posts: Arc<dyn PostsRepository>,
}

impl CommentsService {
    pub fn new(comments: Arc<dyn CommentsRepository>, posts: Arc<dyn PostsRepository>) -> Self {
        Self { comments, posts }
    }

    /// Approved comments of a published post, newest first.
    pub async fn list_for_post(&self, slug: &str) -> Result<Vec<CommentWithAuthor>> {
        let post_id = self.post_id(slug).await?;
        self.comments.approved_comments(post_id).await
    }

    /// Stores a new comment as `pending`; it stays out of listings until approved.
    pub async fn create(
        &self,
        author: &Profile,
        slug: &str,
        dto: CreateCommentDto,
    ) -> Result<CommentWithAuthor> {
        let content =
            validate_comment(&dto.content).map_err(|e| Error::BadRequest(e.to_string()))?;
        let post_id = self.post_id(slug).await?;

        if let Some(parent_id) = dto.parent_id {
            let parent = self.comments.find_comment(parent_id).await?;
            if parent.is_none_or(|p| p.comment.post_id != post_id) {
                return Err(Error::BadRequest("Unknown parent comment".to_string()));
            }
        }

        let comment = self
            .comments
            .create_comment(post_id, author.id, content, dto.parent_id)
            .await?;
        info!(comment_id = %comment.id, %post_id, "comment awaiting moderation");

        Ok(CommentWithAuthor {
            comment,
            author: Some(AuthorRef {
                name: author.name.clone(),
                avatar_url: author.avatar_url.clone(),
            }),
        })
    }

    pub async fn delete(&self, caller: &Profile, comment_id: Uuid) -> Result<()> {
        let comment = self
            .comments
            .find_comment(comment_id)
            .await?
            .ok_or(Error::NotFound)?;

        if comment.comment.author_id != caller.id {
            return Err(Error::Forbidden);
        }
        self.comments.delete_comment(comment_id).await
    }

    async fn post_id(&self, slug: &str) -> Result<Uuid> {
        self.posts
            .find_published_by_slug(slug)
            .await?
            .map(|p| p.id)
            .ok_or(Error::NotFound)
    }
}
