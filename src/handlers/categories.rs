use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};
use serde_json::json;

use crate::{AppState, Result};

pub fn categories_handler() -> Router {
    Router::new().route("/categories", get(list_categories))
}

async fn list_categories(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse> {
    let categories = app_state.posts_service.list_categories().await?;
    Ok(Json(json!({ "categories": categories })))
}
