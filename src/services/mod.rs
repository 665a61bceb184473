pub mod auth;
pub mod comments;
pub mod posts;
pub mod rate_limit;
pub mod tags;
pub mod upload;
