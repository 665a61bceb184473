use std::sync::Arc;

use axum::{
    middleware::from_fn, response::IntoResponse, routing::get, Extension, Json, Router,
};
use serde_json::json;

use crate::{
    middleware::{auth, AuthUser},
    AppState, Result,
};

/// Routes that only make sense for a signed-in caller.
pub fn account_handler() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/admin/posts", get(admin_posts))
        .route_layer(from_fn(auth))
}

async fn me(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({ "profile": user.profile }))
}

async fn admin_posts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let posts = app_state
        .posts_service
        .list_for_author(&user.profile)
        .await?;
    Ok(Json(json!({ "posts": posts })))
}
