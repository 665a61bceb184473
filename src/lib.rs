use std::sync::Arc;

use config::Config;
use repositories::{
    categories_repo::CategoriesRepository, comments_repo::CommentsRepository,
    posts_repo::PostsRepository, profiles_repo::ProfilesRepository, tags_repo::TagsRepository,
};
use services::{
    auth::AuthService, comments::CommentsService, posts::PostsService,
    rate_limit::SearchRateLimiter, tags::TagsService, upload::UploadService,
};
use storage::ObjectStore;

pub use self::errors::{Error, Result};

pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

pub struct AppState {
    pub config: Config,
    pub auth_service: AuthService,
    pub posts_service: PostsService,
    pub tags_service: TagsService,
    pub comments_service: CommentsService,
    pub upload_service: UploadService,
    pub search_limiter: SearchRateLimiter,
}

impl AppState {
    /// Wires every service to `repo`, which backs all the tables.
    pub fn new<R>(config: Config, repo: Arc<R>, store: Arc<dyn ObjectStore>) -> Self
    where
        R: PostsRepository
            + TagsRepository
            + CommentsRepository
            + CategoriesRepository
            + ProfilesRepository
            + 'static,
    {
        let search_limiter =
            SearchRateLimiter::new(config.search_rate_limit, config.search_rate_window);

        AppState {
            auth_service: AuthService::new(repo.clone(), config.jwt_secret.clone()),
            posts_service: PostsService::new(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo.clone(),
            ),
            tags_service: TagsService::new(repo.clone()),
            comments_service: CommentsService::new(repo.clone(), repo),
            upload_service: UploadService::new(store),
            search_limiter,
            config,
        }
    }
}
