use std::sync::Arc;

use axum::{
    extract::Path,
    handler::Handler,
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};

use crate::{
    middleware::{auth, AuthUser},
    models::{
        comments::{CommentResponse, CommentsResponse, CreateCommentDto},
        response::SuccessResponse,
    },
    AppState, Result,
};

use super::posts::parse_id;

pub fn comments_handler() -> Router {
    Router::new()
        .route(
            "/posts/{post}/comments",
            get(list_comments).post(create_comment.layer(from_fn(auth))),
        )
        .route(
            "/comments/{id}",
            delete(delete_comment).route_layer(from_fn(auth)),
        )
}

async fn list_comments(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let comments = app_state.comments_service.list_for_post(&slug).await?;
    Ok(Json(CommentsResponse { comments }))
}

async fn create_comment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    Json(comment): Json<CreateCommentDto>,
) -> Result<impl IntoResponse> {
    let comment = app_state
        .comments_service
        .create(&user.profile, &slug, comment)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

async fn delete_comment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse> {
    let comment_id = parse_id(&comment_id)?;
    app_state
        .comments_service
        .delete(&user.profile, comment_id)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}
