use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::posts::PostSummary;

pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct TagWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: i64,
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct CreateTagDto {
    #[validate(length(min = 1, max = 50, message = "Tag name must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(custom(function = "validate_hex_color"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let digits = color.strip_prefix('#').unwrap_or("");
    if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::new("color").with_message("Color must be a hex value like #3B82F6".into()))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TagsResponse {
    pub tags: Vec<TagWithCount>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TagResponse {
    pub tag: Tag,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TagPosts {
    pub tag: Tag,
    pub posts: Vec<PostSummary>,
}
