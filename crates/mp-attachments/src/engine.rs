//! Attachment engine
//!
//! One parameterized engine per image control. The builder fixes the entity,
//! role, owner and serialization up front; the engine then serializes upload
//! and delete batches, applies reorders, and reports every visible change to
//! the owning form as a [`SerializedValue`].
//!
//! The parent gets a [`ResetHandle`] alongside the engine. Reset and teardown
//! both retire the current store generation, so an upload or delete that
//! completes afterwards cannot touch the collection.

use std::sync::{Arc, Weak};

use mp_core::UploadLimits;
use tracing::{debug, info, instrument, warn};

use crate::api::ImageApi;
use crate::config::EngineConfig;
use crate::delete::{DeleteOutcome, DeletionCoordinator};
use crate::error::{AttachmentError, AttachmentResult};
use crate::model::{
    AttachmentId, AttachmentRecord, EntityKind, ExistingImage, ImageRole, SelectedFile,
    SerializationKind, SlotKind,
};
use crate::preview::PreviewUrls;
use crate::reorder::ReorderEngine;
use crate::serialize::{serialize, SerializedValue};
use crate::store::{AttachmentStore, LiveStore};
use crate::upload::{UploadCoordinator, UploadReport};

type ChangeListener = Arc<dyn Fn(&SerializedValue) + Send + Sync>;

/// Builder for [`AttachmentEngine`]
pub struct EngineBuilder {
    config: EngineConfig,
    existing: Vec<ExistingImage>,
    on_change: Option<ChangeListener>,
}

impl EngineBuilder {
    pub fn new(entity: EntityKind, role: ImageRole) -> Self {
        Self {
            config: EngineConfig::new(entity, role),
            existing: Vec::new(),
            on_change: None,
        }
    }

    /// Id of the persisted owning entity; without one the engine runs in create mode
    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.config.owner_id = Some(owner_id.into());
        self
    }

    pub fn max_files(mut self, max_files: usize) -> Self {
        self.config.max_files = max_files;
        self
    }

    /// Apply configured upload limits for this engine's slot kind
    pub fn limits(mut self, limits: &UploadLimits) -> Self {
        self.config.max_files = self.config.slot_kind().default_max(limits);
        self.config.max_filename_length = limits.max_filename_length;
        self
    }

    pub fn serialization(mut self, kind: SerializationKind) -> Self {
        self.config.serialization = kind;
        self
    }

    pub fn download_base(mut self, base: impl Into<String>) -> Self {
        self.config.download_base = base.into();
        self
    }

    /// Images already persisted for the owner
    pub fn existing_images(mut self, images: Vec<ExistingImage>) -> Self {
        self.existing = images;
        self
    }

    /// Hydrate from a previously emitted value
    pub fn existing_value(mut self, value: &SerializedValue) -> Self {
        self.existing = value.urls().into_iter().map(ExistingImage::from_url).collect();
        self
    }

    pub fn on_change(mut self, listener: impl Fn(&SerializedValue) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(listener));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn build<A, P>(self, api: Arc<A>, previews: Arc<P>) -> (AttachmentEngine<A, P>, ResetHandle)
    where
        A: ImageApi + ?Sized + 'static,
        P: PreviewUrls + ?Sized + 'static,
    {
        let records = hydration_records(self.config.slot_kind(), self.existing);
        info!(
            entity = %self.config.entity,
            role = %self.config.role,
            owner = ?self.config.owner_id,
            existing = records.len(),
            "Attachment engine created"
        );

        let inner = Arc::new(EngineInner {
            api,
            previews,
            config: self.config,
            store: LiveStore::new(AttachmentStore::with_records(records)),
            op_lock: tokio::sync::Mutex::new(()),
            on_change: self.on_change,
        });
        let weak = Arc::downgrade(&inner);
        let target: Weak<dyn Resettable> = weak;
        (AttachmentEngine { inner }, ResetHandle { target })
    }
}

fn hydration_records(slot_kind: SlotKind, images: Vec<ExistingImage>) -> Vec<AttachmentRecord> {
    let keep = match slot_kind {
        SlotKind::Single => 1,
        SlotKind::Multi => images.len(),
    };
    if images.len() > keep {
        warn!(supplied = images.len(), kept = keep, "Extra existing images ignored for single slot");
    }
    images
        .into_iter()
        .take(keep)
        .enumerate()
        .map(|(seq, image)| image.into_record(seq))
        .collect()
}

trait Resettable: Send + Sync {
    fn reset(&self) -> bool;
}

struct EngineInner<A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> {
    api: Arc<A>,
    previews: Arc<P>,
    config: EngineConfig,
    store: LiveStore,
    /// Held for the whole of an upload or delete batch
    op_lock: tokio::sync::Mutex<()>,
    on_change: Option<ChangeListener>,
}

impl<A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> EngineInner<A, P> {
    fn emit(&self, records: &[AttachmentRecord]) {
        let value = serialize(records, self.config.serialization);
        debug!(value = %value, "Collection changed");
        if let Some(listener) = &self.on_change {
            listener(&value);
        }
    }

    fn release_all(&self, records: &[AttachmentRecord]) {
        for record in records.iter().filter(|r| r.is_ephemeral()) {
            self.previews.release(&record.url);
        }
    }

    fn reset(&self) -> bool {
        let Some(dropped) = self.store.reset() else {
            return false;
        };
        self.release_all(&dropped);
        info!(dropped = dropped.len(), "Attachment collection reset");
        self.emit(&[]);
        true
    }

    fn teardown(&self) {
        let dropped = self.store.shut_down();
        if !dropped.is_empty() {
            self.release_all(&dropped);
            debug!(dropped = dropped.len(), "Attachment engine torn down");
        }
    }
}

impl<A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> Resettable for EngineInner<A, P> {
    fn reset(&self) -> bool {
        EngineInner::reset(self)
    }
}

impl<A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> Drop for EngineInner<A, P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Ordered attachment collection bound to one owner and image role
pub struct AttachmentEngine<A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> {
    inner: Arc<EngineInner<A, P>>,
}

impl<A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> Clone for AttachmentEngine<A, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> AttachmentEngine<A, P> {
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Validate and upload a batch of files
    ///
    /// A rejected batch changes nothing. Otherwise each file is processed in
    /// order and per-file failures are collected in the report.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn upload(&self, files: Vec<SelectedFile>) -> AttachmentResult<UploadReport> {
        let inner = &*self.inner;
        let _guard = inner.op_lock.lock().await;
        let ticket = inner.store.ticket().ok_or(AttachmentError::Inactive)?;

        let coordinator = UploadCoordinator::new(&*inner.api, &*inner.previews, &inner.config);
        if let Err(e) = coordinator.validate(&files, inner.store.len()) {
            warn!(error = %e, "Upload batch rejected");
            return Err(e);
        }

        let report = coordinator.upload(files, &inner.store, ticket).await;
        if let Some(collection) = &report.collection {
            inner.emit(collection);
        }
        Ok(report)
    }

    /// Delete one record, remotely first when it lives on the server
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete(&self, id: &AttachmentId) -> AttachmentResult<DeleteOutcome> {
        let inner = &*self.inner;
        let _guard = inner.op_lock.lock().await;
        let ticket = inner.store.ticket().ok_or(AttachmentError::Inactive)?;

        let report = DeletionCoordinator::new(&*inner.api, &*inner.previews, &inner.config)
            .delete(id, &inner.store, ticket)
            .await?;
        if let Some(collection) = &report.collection {
            inner.emit(collection);
        }
        Ok(report.outcome)
    }

    /// Apply a finished drag of `dragged` onto `target`
    ///
    /// Returns `false` without emitting when the gesture is a no-op.
    pub fn reorder(&self, dragged: &AttachmentId, target: &AttachmentId) -> bool {
        let inner = &*self.inner;
        let engine = ReorderEngine::new(inner.config.slot_kind());
        let collection = inner
            .store
            .with_store(|s| {
                let (from, to) = engine.plan(&s.snapshot(), dragged, target)?;
                Some(s.reorder(from, to))
            })
            .flatten();

        match collection {
            Some(collection) => {
                debug!(dragged = %dragged, target = %target, "Attachments reordered");
                inner.emit(&collection);
                true
            }
            None => false,
        }
    }

    /// Replace the collection with images loaded after construction
    ///
    /// An empty set is ignored. Nothing is emitted. Starts a new store
    /// generation, so a batch still in flight cannot commit on top of it.
    pub fn hydrate(&self, images: Vec<ExistingImage>) -> bool {
        if images.is_empty() {
            return false;
        }
        let inner = &*self.inner;
        let records = hydration_records(inner.config.slot_kind(), images);
        let count = records.len();
        let displaced = inner.store.replace_generation(records);

        match displaced {
            Some(displaced) => {
                inner.release_all(&displaced);
                info!(count, "Attachment collection hydrated");
                true
            }
            None => false,
        }
    }

    /// Clear the collection, release previews and emit the empty value
    pub fn reset(&self) -> bool {
        self.inner.reset()
    }

    /// Retire the engine; later operations fail with `Inactive`
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    pub fn is_active(&self) -> bool {
        self.inner.store.is_alive()
    }

    pub fn snapshot(&self) -> Vec<AttachmentRecord> {
        self.inner.store.snapshot()
    }

    /// Current serialized value
    pub fn value(&self) -> SerializedValue {
        serialize(&self.snapshot(), self.inner.config.serialization)
    }

    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    pub fn remaining_capacity(&self) -> usize {
        self.inner.config.max_files.saturating_sub(self.len())
    }

    /// Whether the upload control should be enabled
    pub fn can_add(&self) -> bool {
        self.is_active() && self.remaining_capacity() > 0
    }
}

/// Reset handle given to the owning form
///
/// Holds no strong reference; resetting a dropped engine is a no-op.
#[derive(Clone)]
pub struct ResetHandle {
    target: Weak<dyn Resettable>,
}

impl ResetHandle {
    /// Reset the engine; `false` if it is gone or torn down
    pub fn reset(&self) -> bool {
        match self.target.upgrade() {
            Some(engine) => engine.reset(),
            None => false,
        }
    }
}

impl std::fmt::Debug for ResetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetHandle")
            .field("attached", &(self.target.strong_count() > 0))
            .finish()
    }
}
