use async_trait::async_trait;

use crate::Result;

pub mod local;

/// Where uploaded images end up. `put` returns the public URL of the object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<String>;
}
