//! # mp-attachments
//!
//! Ordered image attachments for marketplace entities.
//!
//! ## Features
//!
//! - One engine for item images and producer logo/portfolio images
//! - Sequential uploads, with local previews while the owner is unsaved
//! - Fail-closed remote deletes
//! - Drag reordering with array-move semantics
//! - Comma-joined or list serialization for the owning form
//!
//! ## Example
//!
//! ```rust,ignore
//! use mp_attachments::{EngineBuilder, EntityKind, ImageRole, MemoryPreviewUrls, SelectedFile};
//! use std::sync::Arc;
//!
//! let (engine, reset) = EngineBuilder::new(EntityKind::Producer, ImageRole::Portfolio)
//!     .owner(producer_id)
//!     .on_change(|value| form.set("images", value.clone()))
//!     .build(Arc::new(api), Arc::new(MemoryPreviewUrls::new()));
//!
//! let report = engine.upload(vec![SelectedFile::new("barn.jpg", bytes)]).await?;
//! ```

pub mod api;
pub mod config;
pub mod delete;
pub mod engine;
pub mod error;
pub mod http;
pub mod model;
pub mod preview;
pub mod reorder;
pub mod serialize;
pub mod store;
pub mod upload;

pub use api::{ApiCall, ApiError, ApiGate, ApiResult, ImageApi, MemoryImageApi, UploadRequest};
pub use config::EngineConfig;
pub use delete::{DeleteOutcome, DeleteReport, DeletionCoordinator};
pub use engine::{AttachmentEngine, EngineBuilder, ResetHandle};
pub use error::{AttachmentError, AttachmentResult};
pub use http::HttpImageApi;
pub use model::{
    AttachmentId, AttachmentRecord, EntityKind, ExistingImage, IdNamespace, ImageRole, Owner,
    SelectedFile, SerializationKind, SlotKind, UploadedImage,
};
pub use preview::{MemoryPreviewUrls, PreviewUrls};
pub use reorder::ReorderEngine;
pub use serialize::{deserialize, parse_joined, serialize, SerializedValue};
pub use store::{AttachmentStore, LiveStore, Ticket};
pub use upload::{UploadCoordinator, UploadReport};
