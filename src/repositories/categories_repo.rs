use async_trait::async_trait;
use uuid::Uuid;

use crate::{models::categories::Category, Result};

use super::PostgresRepo;

#[async_trait]
pub trait CategoriesRepository: Sync + Send {
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn find_category(&self, category_id: Uuid) -> Result<Option<Category>>;
}

#[async_trait]
impl CategoriesRepository for PostgresRepo {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn find_category(&self, category_id: Uuid) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, created_at FROM categories WHERE id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }
}
