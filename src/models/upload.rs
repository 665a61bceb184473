use serde::{Deserialize, Serialize};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Cover,
    Gallery,
}

impl UploadKind {
    pub fn to_str(&self) -> &str {
        match self {
            Self::Cover => "cover",
            Self::Gallery => "gallery",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: UploadKind,
    pub size: usize,
}
