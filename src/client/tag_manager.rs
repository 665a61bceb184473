use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::{
    models::tags::{CreateTagDto, Tag, TagWithCount},
    utils::slug::slugify,
};

use super::{BlogApi, ClientError, ClientResult};

pub const CLOUD_MIN_REM: f32 = 0.875;
pub const CLOUD_MAX_REM: f32 = 1.25;

/// Tag picker of the post form: the vocabulary, the selection and the create box.
pub struct TagManager {
    api: Arc<dyn BlogApi>,
    vocabulary: Vec<TagWithCount>,
    selected: Vec<Uuid>,
    input: String,
}

impl TagManager {
    /// Fetches the vocabulary once; `selected` is the post's current tag ids.
    pub async fn load(api: Arc<dyn BlogApi>, selected: Vec<Uuid>) -> ClientResult<Self> {
        let vocabulary = api.list_tags().await?;
        let mut manager = Self {
            api,
            vocabulary,
            selected: Vec::with_capacity(selected.len()),
            input: String::new(),
        };
        for id in selected {
            manager.select(id);
        }
        Ok(manager)
    }

    pub fn vocabulary(&self) -> &[TagWithCount] {
        &self.vocabulary
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn selected(&self) -> &[Uuid] {
        &self.selected
    }

    pub fn selected_tags(&self) -> Vec<&Tag> {
        self.selected
            .iter()
            .filter_map(|id| self.find(|t| t.id == *id))
            .collect()
    }

    /// Unselected tags whose name contains the input, ignoring case.
    pub fn suggestions(&self) -> Vec<&Tag> {
        let needle = self.input.trim().to_lowercase();
        self.vocabulary
            .iter()
            .map(|t| &t.tag)
            .filter(|t| !self.selected.contains(&t.id))
            .filter(|t| t.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn select(&mut self, tag_id: Uuid) {
        if !self.selected.contains(&tag_id) {
            self.selected.push(tag_id);
        }
    }

    pub fn remove(&mut self, tag_id: Uuid) {
        self.selected.retain(|id| *id != tag_id);
    }

    /// Creates a tag from the input and selects it. When the name collides with an
    /// existing tag, that tag is selected instead.
    pub async fn create(&mut self) -> ClientResult<Tag> {
        let name = self.input.trim().to_string();
        if name.is_empty() {
            return Err(ClientError::Validation("Tag name is required".to_string()));
        }

        let request = CreateTagDto {
            name: name.clone(),
            color: None,
        };
        match self.api.create_tag(&request).await {
            Ok(tag) => {
                self.vocabulary.push(TagWithCount {
                    tag: tag.clone(),
                    post_count: 0,
                });
                self.accept(tag.id);
                Ok(tag)
            }
            Err(ClientError::Conflict(message)) => {
                let existing = match self.existing(&name) {
                    Some(tag) => Some(tag),
                    None => {
                        debug!(name, "tag conflict not in vocabulary, reloading");
                        self.vocabulary = self.api.list_tags().await?;
                        self.existing(&name)
                    }
                };
                let tag = existing.ok_or(ClientError::Conflict(message))?;
                self.accept(tag.id);
                Ok(tag)
            }
            Err(err) => Err(err),
        }
    }

    pub fn cloud(&self) -> Vec<CloudEntry> {
        tag_cloud(&self.vocabulary)
    }

    fn accept(&mut self, tag_id: Uuid) {
        self.select(tag_id);
        self.input.clear();
    }

    fn existing(&self, name: &str) -> Option<Tag> {
        let slug = slugify(name);
        let lowered = name.to_lowercase();
        self.find(|t| t.name.to_lowercase() == lowered || t.slug == slug)
            .cloned()
    }

    fn find(&self, predicate: impl Fn(&Tag) -> bool) -> Option<&Tag> {
        self.vocabulary
            .iter()
            .map(|t| &t.tag)
            .find(|t| predicate(t))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudEntry {
    pub tag: Tag,
    pub post_count: i64,
    pub font_rem: f32,
}

/// Tags that have posts, sized linearly by post count between
/// [`CLOUD_MIN_REM`] and [`CLOUD_MAX_REM`].
pub fn tag_cloud(tags: &[TagWithCount]) -> Vec<CloudEntry> {
    let used: Vec<&TagWithCount> = tags.iter().filter(|t| t.post_count > 0).collect();
    let min = used.iter().map(|t| t.post_count).min().unwrap_or(0);
    let max = used.iter().map(|t| t.post_count).max().unwrap_or(0);

    used.into_iter()
        .map(|t| {
            let font_rem = if max == min {
                CLOUD_MIN_REM
            } else {
                let ratio = (t.post_count - min) as f32 / (max - min) as f32;
                CLOUD_MIN_REM + ratio * (CLOUD_MAX_REM - CLOUD_MIN_REM)
            };
            CloudEntry {
                tag: t.tag.clone(),
                post_count: t.post_count,
                font_rem,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tag(name: &str, post_count: i64) -> TagWithCount {
        TagWithCount {
            tag: Tag {
                id: Uuid::new_v4(),
                name: name.to_string(),
                slug: slugify(name),
                color: "#3B82F6".to_string(),
                created_at: Utc::now(),
            },
            post_count,
        }
    }

    #[test]
    fn cloud_interpolates_between_bounds() {
        let cloud = tag_cloud(&[tag("a", 1), tag("b", 3), tag("c", 5), tag("unused", 0)]);

        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud[0].font_rem, CLOUD_MIN_REM);
        assert!((cloud[1].font_rem - 1.0625).abs() < f32::EPSILON);
        assert_eq!(cloud[2].font_rem, CLOUD_MAX_REM);
    }

    #[test]
    fn cloud_with_equal_counts_uses_minimum() {
        let cloud = tag_cloud(&[tag("a", 2), tag("b", 2)]);
        assert!(cloud.iter().all(|e| e.font_rem == CLOUD_MIN_REM));
        assert!(tag_cloud(&[]).is_empty());
    }
}
