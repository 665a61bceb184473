use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    handler::Handler,
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    middleware::{auth, AuthUser, ClientAddr},
    models::{
        posts::{
            CreatePostDto, PostListQuery, PostsResponse, RelatedQuery, SearchQuery,
            UpdatePostDto,
        },
        response::SuccessResponse,
    },
    AppState, Error, Result,
};

pub fn posts_handler() -> Router {
    Router::new()
        .route(
            "/posts",
            get(list_posts).post(create_post.layer(from_fn(auth))),
        )
        .route("/posts/search", get(search_posts))
        .route("/posts/related", get(related_posts))
        .route(
            "/posts/{post}",
            get(get_post)
                .patch(update_post.layer(from_fn(auth)))
                .delete(delete_post.layer(from_fn(auth))),
        )
}

async fn list_posts(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse> {
    let page = app_state.posts_service.list_page(query).await?;
    Ok(Json(page))
}

async fn search_posts(
    Extension(app_state): Extension<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    app_state.search_limiter.check(&client)?;

    let results = app_state.posts_service.search(query.q.as_deref()).await?;
    Ok(Json(results))
}

async fn related_posts(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<RelatedQuery>,
) -> Result<impl IntoResponse> {
    let posts = app_state.posts_service.related(query).await?;
    Ok(Json(PostsResponse { posts }))
}

async fn get_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let post = app_state.posts_service.get_by_slug(&slug).await?;
    Ok(Json(post))
}

async fn create_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(new_post): Json<CreatePostDto>,
) -> Result<impl IntoResponse> {
    let post = app_state
        .posts_service
        .create(&user.profile, new_post)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(update): Json<UpdatePostDto>,
) -> Result<impl IntoResponse> {
    let post_id = parse_id(&post_id)?;
    let post = app_state
        .posts_service
        .update(&user.profile, post_id, update)
        .await?;
    Ok(Json(post))
}

async fn delete_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse> {
    let post_id = parse_id(&post_id)?;
    app_state
        .posts_service
        .delete(&user.profile, post_id)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Ids in paths that are not UUIDs cannot name an existing row.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::NotFound)
}
