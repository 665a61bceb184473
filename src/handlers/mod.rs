pub mod account;
pub mod categories;
pub mod comments;
pub mod posts;
pub mod tags;
pub mod upload;
