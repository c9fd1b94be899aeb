//! Image endpoint abstraction
//!
//! The upload and delete endpoints of the marketplace API, as seen by the
//! engine.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

use crate::model::{ImageRole, Owner, SelectedFile, UploadedImage};

/// Endpoint errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Rejected by server: {0}")]
    Rejected(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// One file to upload, scoped to its owning entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub owner: Owner,
    pub role: ImageRole,
    pub file: SelectedFile,
}

/// Upload/delete endpoints
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageApi: Send + Sync {
    /// Upload one file; returns the server id, display name and path
    async fn upload(&self, request: UploadRequest) -> ApiResult<UploadedImage>;

    /// Delete a previously uploaded image
    async fn delete(&self, image_id: &str) -> ApiResult<()>;
}

/// A call observed by [`MemoryImageApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Upload { owner_id: String, file: String },
    Delete { image_id: String },
}

/// Pauses uploads until the test lets them through
#[derive(Debug, Default)]
pub struct ApiGate {
    entered: Notify,
    proceed: Notify,
}

impl ApiGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait until an upload is parked at the gate
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one parked upload continue
    pub fn open(&self) {
        self.proceed.notify_one();
    }
}

/// In-memory image endpoints for testing and offline use
#[derive(Debug, Default)]
pub struct MemoryImageApi {
    images: Mutex<Vec<UploadedImage>>,
    calls: Mutex<Vec<ApiCall>>,
    failing_files: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    gate: Mutex<Option<Arc<ApiGate>>>,
    next_id: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    path_prefix: String,
}

impl MemoryImageApi {
    pub fn new() -> Self {
        Self::with_path_prefix("uploads")
    }

    /// Paths returned by uploads start with `prefix`
    pub fn with_path_prefix(prefix: impl Into<String>) -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            path_prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Make uploads of `file_name` fail
    pub fn fail_upload_of(&self, file_name: impl Into<String>) {
        self.failing_files.lock().insert(file_name.into());
    }

    /// Make deletes of `image_id` fail
    pub fn fail_delete_of(&self, image_id: impl Into<String>) {
        self.failing_deletes.lock().insert(image_id.into());
    }

    /// Park every upload at `gate` until released
    pub fn set_gate(&self, gate: Arc<ApiGate>) {
        *self.gate.lock() = Some(gate);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ApiCall::Upload { .. }))
            .count()
    }

    pub fn delete_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ApiCall::Delete { .. }))
            .count()
    }

    /// Images currently held server-side
    pub fn stored(&self) -> Vec<UploadedImage> {
        self.images.lock().clone()
    }

    /// Highest number of uploads observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageApi for MemoryImageApi {
    async fn upload(&self, request: UploadRequest) -> ApiResult<UploadedImage> {
        self.calls.lock().push(ApiCall::Upload {
            owner_id: request.owner.id.clone(),
            file: request.file.name.clone(),
        });

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.proceed.notified().await;
        }
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_files.lock().contains(&request.file.name) {
            return Err(ApiError::Rejected(format!(
                "upload of {} refused",
                request.file.name
            )));
        }

        let id = format!("img-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let image = UploadedImage {
            path: format!("{}/{}-{}", self.path_prefix, id, request.file.name),
            name: request.file.display_name(),
            id,
        };
        debug!(id = %image.id, owner = %request.owner.id, role = %request.role, "Memory upload stored");
        self.images.lock().push(image.clone());
        Ok(image)
    }

    async fn delete(&self, image_id: &str) -> ApiResult<()> {
        self.calls.lock().push(ApiCall::Delete {
            image_id: image_id.to_string(),
        });
        tokio::task::yield_now().await;

        if self.failing_deletes.lock().contains(image_id) {
            return Err(ApiError::Http {
                status: 500,
                message: format!("could not delete {}", image_id),
            });
        }

        let mut images = self.images.lock();
        let before = images.len();
        images.retain(|i| i.id != image_id);
        if images.len() == before {
            return Err(ApiError::Http {
                status: 404,
                message: format!("image {} not found", image_id),
            });
        }
        Ok(())
    }
}
