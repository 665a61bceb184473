use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use uuid::Uuid;

use crate::models::{
    comments::{CommentResponse, CommentWithAuthor, CommentsResponse, CreateCommentDto},
    posts::{CreatePostDto, PostDetail, SearchResponse, UpdatePostDto},
    response::SuccessResponse,
    tags::{CreateTagDto, Tag, TagResponse, TagWithCount, TagsResponse},
    upload::{UploadKind, UploadResponse},
};

use super::{BlogApi, ClientError, ClientResult};

/// `BlogApi` over HTTP against a running server.
#[derive(Debug, Clone)]
pub struct HttpBlogApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpBlogApi {
    /// `base_url` is the server origin, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Transport(e.to_string()));
        }
        Err(error_from(response).await)
    }
}

async fn error_from(response: Response) -> ClientError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };

    ClientError::from_status(status.as_u16(), message, retry_after)
}

#[async_trait]
impl BlogApi for HttpBlogApi {
    async fn search_posts(&self, query: &str) -> ClientResult<SearchResponse> {
        let url = self.url(&format!("/posts/search?q={}", urlencoding::encode(query)));
        self.send(self.client.get(url)).await
    }

    async fn create_post(&self, post: &CreatePostDto) -> ClientResult<PostDetail> {
        self.send(self.client.post(self.url("/posts")).json(post))
            .await
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        update: &UpdatePostDto,
    ) -> ClientResult<PostDetail> {
        let url = self.url(&format!("/posts/{post_id}"));
        self.send(self.client.patch(url).json(update)).await
    }

    async fn delete_post(&self, post_id: Uuid) -> ClientResult<()> {
        let url = self.url(&format!("/posts/{post_id}"));
        self.send::<SuccessResponse>(self.client.delete(url))
            .await
            .map(|_| ())
    }

    async fn list_tags(&self) -> ClientResult<Vec<TagWithCount>> {
        self.send::<TagsResponse>(self.client.get(self.url("/tags")))
            .await
            .map(|r| r.tags)
    }

    async fn create_tag(&self, tag: &CreateTagDto) -> ClientResult<Tag> {
        self.send::<TagResponse>(self.client.post(self.url("/tags")).json(tag))
            .await
            .map(|r| r.tag)
    }

    async fn list_comments(&self, slug: &str) -> ClientResult<Vec<CommentWithAuthor>> {
        let url = self.url(&format!("/posts/{}/comments", urlencoding::encode(slug)));
        self.send::<CommentsResponse>(self.client.get(url))
            .await
            .map(|r| r.comments)
    }

    async fn create_comment(
        &self,
        slug: &str,
        comment: &CreateCommentDto,
    ) -> ClientResult<CommentWithAuthor> {
        let url = self.url(&format!("/posts/{}/comments", urlencoding::encode(slug)));
        self.send::<CommentResponse>(self.client.post(url).json(comment))
            .await
            .map(|r| r.comment)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> ClientResult<()> {
        let url = self.url(&format!("/comments/{comment_id}"));
        self.send::<SuccessResponse>(self.client.delete(url))
            .await
            .map(|_| ())
    }

    async fn upload_image(&self, kind: UploadKind, bytes: &[u8]) -> ClientResult<UploadResponse> {
        let url = self.url(&format!("/upload?type={}", kind.to_str()));
        let request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec());
        self.send(request).await
    }
}
