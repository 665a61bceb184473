use std::sync::Arc;

use uuid::Uuid;

use super::{BlogApi, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    Closed,
    Confirming,
    Deleting,
}

/// Confirmation-gated delete of one post. Ownership is checked by the server; its
/// 403/404 message is kept in `error`.
pub struct DeletePostDialog {
    api: Arc<dyn BlogApi>,
    post_id: Uuid,
    state: DeleteState,
    error: Option<String>,
}

impl DeletePostDialog {
    pub fn new(api: Arc<dyn BlogApi>, post_id: Uuid) -> Self {
        Self {
            api,
            post_id,
            state: DeleteState::Closed,
            error: None,
        }
    }

    pub fn state(&self) -> DeleteState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn open(&mut self) {
        self.state = DeleteState::Confirming;
        self.error = None;
    }

    pub fn cancel(&mut self) {
        if self.state == DeleteState::Confirming {
            self.state = DeleteState::Closed;
        }
    }

    /// Only acts while the dialog is confirming. On success the dialog closes and
    /// the caller refreshes its listing.
    pub async fn confirm(&mut self) -> ClientResult<bool> {
        if self.state != DeleteState::Confirming {
            return Ok(false);
        }
        self.state = DeleteState::Deleting;
        self.error = None;

        match self.api.delete_post(self.post_id).await {
            Ok(()) => {
                self.state = DeleteState::Closed;
                Ok(true)
            }
            Err(err) => {
                self.state = DeleteState::Confirming;
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}
