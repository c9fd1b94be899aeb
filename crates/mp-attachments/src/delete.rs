//! Deletion coordinator

use tracing::{debug, info, instrument, warn};

use crate::api::ImageApi;
use crate::config::EngineConfig;
use crate::error::{AttachmentError, AttachmentResult};
use crate::model::{AttachmentId, AttachmentRecord, IdNamespace};
use crate::preview::PreviewUrls;
use crate::store::{LiveStore, Ticket};

/// How a record was deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Dropped from the collection only
    Local,
    /// Deleted on the server, then dropped
    Remote,
}

#[derive(Debug)]
pub struct DeleteReport {
    pub outcome: DeleteOutcome,
    /// Collection after removal; `None` when a reset landed first
    pub collection: Option<Vec<AttachmentRecord>>,
}

pub struct DeletionCoordinator<'a, A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> {
    api: &'a A,
    previews: &'a P,
    config: &'a EngineConfig,
}

impl<'a, A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> DeletionCoordinator<'a, A, P> {
    pub fn new(api: &'a A, previews: &'a P, config: &'a EngineConfig) -> Self {
        Self {
            api,
            previews,
            config,
        }
    }

    /// Local ids and records of an entity that does not exist yet never hit the server
    pub fn classify(&self, id: &AttachmentId) -> DeleteOutcome {
        match id.namespace() {
            IdNamespace::Existing | IdNamespace::Temp => DeleteOutcome::Local,
            IdNamespace::Server if self.config.is_create_mode() => DeleteOutcome::Local,
            IdNamespace::Server => DeleteOutcome::Remote,
        }
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete(
        &self,
        id: &AttachmentId,
        store: &LiveStore,
        ticket: Ticket,
    ) -> AttachmentResult<DeleteReport> {
        let present = store
            .with_current(ticket, |s| s.contains(id))
            .ok_or(AttachmentError::Inactive)?;
        if !present {
            return Err(AttachmentError::NotFound(id.clone()));
        }

        let outcome = self.classify(id);
        if outcome == DeleteOutcome::Remote {
            if let Err(source) = self.api.delete(id.as_str()).await {
                warn!(error = %source, "Remote delete failed, keeping record");
                return Err(AttachmentError::DeleteFailed {
                    id: id.clone(),
                    source,
                });
            }
            debug!("Remote delete succeeded");
        }

        let previews = self.previews;
        let collection = store.with_current(ticket, |s| {
            if let Some(record) = s.get(id) {
                if record.is_ephemeral() {
                    previews.release(&record.url);
                }
            }
            s.remove(id)
        });

        match &collection {
            Some(records) => info!(outcome = ?outcome, remaining = records.len(), "Attachment deleted"),
            None => warn!(outcome = ?outcome, "Collection was reset during delete, nothing to remove"),
        }
        Ok(DeleteReport {
            outcome,
            collection,
        })
    }
}
