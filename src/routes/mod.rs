use std::sync::Arc;

use axum::{Extension, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{
        account::account_handler, categories::categories_handler, comments::comments_handler,
        posts::posts_handler, tags::tags_handler, upload::upload_handler,
    },
    middleware::configure_cors,
    AppState,
};

pub fn create_routes(app_state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&app_state.config.upload_dir);
    let cors = configure_cors(app_state.config.cors_origin.as_deref());

    let api_route = Router::new()
        .merge(posts_handler())
        .merge(comments_handler())
        .merge(tags_handler())
        .merge(categories_handler())
        .merge(account_handler())
        .merge(upload_handler())
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new().nest("/api", api_route).layer(cors)
}
