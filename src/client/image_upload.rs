use std::sync::Arc;

use tracing::debug;

use crate::{
    models::upload::{UploadKind, UploadResponse, MAX_UPLOAD_BYTES},
    services::upload::detect_extension,
};

use super::{editor::PostForm, visible, BlogApi, ClientError, ClientResult, Notice};

/// Checks a picked file the way the server will: size cap first, then the image
/// format from its magic bytes. Returns the detected extension.
pub fn check_image(bytes: &[u8]) -> ClientResult<&'static str> {
    if bytes.is_empty() {
        return Err(ClientError::Validation("No file provided".to_string()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ClientError::Validation(
            "File too large. Maximum size is 5MB.".to_string(),
        ));
    }
    detect_extension(bytes).ok_or_else(|| {
        ClientError::Validation("Please select an image file (JPEG, PNG, WebP, GIF)".to_string())
    })
}

/// Image picker of the post form: pick a file, choose cover or gallery, upload,
/// and hand the returned URL to the form.
pub struct ImageUpload {
    api: Arc<dyn BlogApi>,
    kind: UploadKind,
    file: Option<Vec<u8>>,
    url: Option<String>,
    uploading: bool,
    notice: Option<Notice>,
}

impl ImageUpload {
    /// `initial_url` is the image the post already has, if any.
    pub fn new(api: Arc<dyn BlogApi>, initial_url: Option<String>) -> Self {
        Self {
            api,
            kind: UploadKind::Cover,
            file: None,
            url: initial_url.filter(|u| !u.is_empty()),
            uploading: false,
            notice: None,
        }
    }

    pub fn kind(&self) -> UploadKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: UploadKind) {
        self.kind = kind;
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn notice(&self) -> Option<&Notice> {
        visible(&self.notice)
    }

    /// Keeps the file for upload if it passes [`check_image`]; a rejected file
    /// leaves any earlier pick in place.
    pub fn select(&mut self, bytes: Vec<u8>) -> ClientResult<&'static str> {
        match check_image(&bytes) {
            Ok(ext) => {
                self.file = Some(bytes);
                Ok(ext)
            }
            Err(err) => {
                self.notice = Some(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    pub async fn upload(&mut self) -> ClientResult<UploadResponse> {
        let file = self
            .file
            .take()
            .ok_or_else(|| ClientError::Validation("No file selected".to_string()))?;

        self.uploading = true;
        let outcome = self.api.upload_image(self.kind, &file).await;
        self.uploading = false;

        match outcome {
            Ok(uploaded) => {
                debug!(url = %uploaded.url, "image uploaded");
                self.url = Some(uploaded.url.clone());
                self.notice = Some(Notice::success("Image uploaded"));
                Ok(uploaded)
            }
            Err(err) => {
                self.file = Some(file);
                self.notice = Some(Notice::error(format!("Upload failed: {err}")));
                Err(err)
            }
        }
    }

    /// Uploads and stores the URL as the form's cover image.
    pub async fn upload_into(&mut self, form: &mut PostForm) -> ClientResult<UploadResponse> {
        let uploaded = self.upload().await?;
        form.cover_image = Some(uploaded.url.clone());
        Ok(uploaded)
    }

    pub fn remove(&mut self, form: &mut PostForm) {
        self.file = None;
        self.url = None;
        form.cover_image = None;
    }
}
