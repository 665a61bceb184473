use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{models::profiles::Profile, Result};

use super::PostgresRepo;

#[async_trait]
pub trait ProfilesRepository: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>>;
}

#[async_trait]
impl ProfilesRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, name, avatar_url, role, created_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        tracing::debug!(profile_found = profile.is_some(), "Profile query completed");

        Ok(profile)
    }
}
