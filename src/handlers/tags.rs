use std::sync::Arc;

use axum::{
    extract::Path,
    handler::Handler,
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};

use crate::{
    middleware::auth,
    models::tags::{CreateTagDto, TagResponse, TagsResponse},
    AppState, Result,
};

pub fn tags_handler() -> Router {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag.layer(from_fn(auth))))
        .route("/tags/{slug}/posts", get(tag_posts))
}

async fn list_tags(Extension(app_state): Extension<Arc<AppState>>) -> Result<impl IntoResponse> {
    let tags = app_state.tags_service.list().await?;
    Ok(Json(TagsResponse { tags }))
}

async fn create_tag(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(new_tag): Json<CreateTagDto>,
) -> Result<impl IntoResponse> {
    let tag = app_state.tags_service.create(new_tag).await?;
    Ok((StatusCode::CREATED, Json(TagResponse { tag })))
}

async fn tag_posts(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let tag_posts = app_state.tags_service.posts_for_tag(&slug).await?;
    Ok(Json(tag_posts))
}
