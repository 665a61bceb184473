use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query},
    middleware::from_fn,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};

use crate::{
    middleware::{auth, AuthUser},
    models::upload::{UploadQuery, MAX_UPLOAD_BYTES},
    AppState, Result,
};

pub fn upload_handler() -> Router {
    Router::new()
        .route("/upload", post(upload_image))
        .route_layer(from_fn(auth))
        // Bodies a little over the cap still reach the handler and get a JSON 400.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES * 2))
}

async fn upload_image(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let uploaded = app_state
        .upload_service
        .upload(user.profile.id, query.kind.as_deref(), &body)
        .await?;
    Ok(Json(uploaded))
}
