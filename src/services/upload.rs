use std::sync::Arc;

use chrono::Utc;
use image::ImageFormat;
use tracing::info;
use uuid::Uuid;

use crate::{
    models::upload::{UploadKind, UploadResponse, MAX_UPLOAD_BYTES},
    storage::ObjectStore,
    Error, Result,
};

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
}

impl UploadService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Stores an image under `{user}/{kind}/{unix_millis}.{ext}`. The extension
    /// comes from the file's magic bytes, never from anything the client claims.
    pub async fn upload(
        &self,
        user_id: Uuid,
        kind: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadResponse> {
        let kind = parse_kind(kind)?;
        if bytes.is_empty() {
            return Err(Error::BadRequest("No file provided".to_string()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(Error::BadRequest("File too large. Max size is 5MB".to_string()));
        }
        let ext = detect_extension(bytes).ok_or_else(|| {
            Error::BadRequest("Invalid file type. Allowed: JPEG, PNG, WebP, GIF".to_string())
        })?;

        let filename = format!("{}.{}", Utc::now().timestamp_millis(), ext);
        let path = format!("{}/{}/{}", user_id, kind.to_str(), filename);
        let url = self.store.put(&path, bytes).await?;
        info!(%user_id, path, size = bytes.len(), "image uploaded");

        Ok(UploadResponse {
            success: true,
            url,
            filename,
            kind,
            size: bytes.len(),
        })
    }
}

fn parse_kind(kind: Option<&str>) -> Result<UploadKind> {
    match kind {
        Some("cover") => Ok(UploadKind::Cover),
        Some("gallery") => Ok(UploadKind::Gallery),
        _ => Err(Error::BadRequest(
            "Invalid upload type. Use 'cover' or 'gallery'".to_string(),
        )),
    }
}

/// Extension for the accepted image formats, judged by magic bytes.
pub fn detect_extension(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Png => Some("png"),
        ImageFormat::WebP => Some("webp"),
        ImageFormat::Gif => Some("gif"),
        _ => None,
    }
}
