//! Engine errors

use mp_core::ValidationErrors;
use thiserror::Error;

use crate::api::ApiError;
use crate::model::AttachmentId;

#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The batch broke a naming or count rule; nothing was uploaded
    #[error("Validation rejected: {0}")]
    ValidationRejected(ValidationErrors),
    #[error("Upload of {file} failed: {source}")]
    UploadFailed { file: String, source: ApiError },
    /// The record stays in the collection
    #[error("Delete of {id} failed: {source}")]
    DeleteFailed { id: AttachmentId, source: ApiError },
    #[error("Attachment not found: {0}")]
    NotFound(AttachmentId),
    #[error("Attachment engine is no longer active")]
    Inactive,
}

impl AttachmentError {
    /// Short title for user-facing notices
    pub fn title(&self) -> &'static str {
        match self {
            Self::ValidationRejected(_) => "Invalid Selection",
            Self::UploadFailed { .. } => "Upload Error",
            Self::DeleteFailed { .. } => "Delete Error",
            Self::NotFound(_) => "Not Found",
            Self::Inactive => "Unavailable",
        }
    }
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;
