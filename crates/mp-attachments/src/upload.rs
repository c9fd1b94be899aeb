//! Upload coordinator
//!
//! Processes a validated batch strictly in selection order, one file at a
//! time. With an owning entity each file is uploaded right away; in create
//! mode it is staged as a `temp-` record with a local preview url.

use mp_contracts::images::UploadBatchContract;
use mp_contracts::Contract;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, ImageApi, UploadRequest};
use crate::config::EngineConfig;
use crate::error::{AttachmentError, AttachmentResult};
use crate::model::{
    AttachmentId, AttachmentRecord, IdNamespace, Owner, SelectedFile, SlotKind, UploadedImage,
};
use crate::preview::PreviewUrls;
use crate::store::{LiveStore, Ticket};

/// Outcome of one upload batch
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Ids added to the collection, in selection order
    pub committed: Vec<AttachmentId>,
    /// Per-file failures; the rest of the batch still ran
    pub failed: Vec<AttachmentError>,
    /// The engine was reset or torn down before the batch finished
    pub suppressed: bool,
    /// Collection after the batch, when anything was committed
    pub collection: Option<Vec<AttachmentRecord>>,
}

impl UploadReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.failed.is_empty()
    }
}

enum Commit {
    Added(AttachmentId),
    Duplicate(AttachmentId),
    Stale,
}

pub struct UploadCoordinator<'a, A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> {
    api: &'a A,
    previews: &'a P,
    config: &'a EngineConfig,
}

impl<'a, A: ImageApi + ?Sized, P: PreviewUrls + ?Sized> UploadCoordinator<'a, A, P> {
    pub fn new(api: &'a A, previews: &'a P, config: &'a EngineConfig) -> Self {
        Self {
            api,
            previews,
            config,
        }
    }

    /// Check the whole batch before anything is uploaded
    pub fn validate(&self, files: &[SelectedFile], current_count: usize) -> AttachmentResult<()> {
        UploadBatchContract::new(current_count, self.config.max_files)
            .with_max_filename_length(self.config.max_filename_length)
            .validate(files)
            .map_err(AttachmentError::ValidationRejected)
    }

    /// Run a batch that already passed [`validate`](Self::validate)
    #[instrument(skip_all, fields(files = files.len(), entity = %self.config.entity, role = %self.config.role))]
    pub async fn upload(
        &self,
        files: Vec<SelectedFile>,
        store: &LiveStore,
        ticket: Ticket,
    ) -> UploadReport {
        let mut report = UploadReport::default();
        let owner = self.config.owner();

        for file in files {
            let file_name = file.name.clone();
            let record = match &owner {
                Some(owner) => match self.upload_remote(owner, file).await {
                    Ok(record) => record,
                    Err(source) => {
                        warn!(file = %file_name, error = %source, "Upload failed");
                        report.failed.push(AttachmentError::UploadFailed {
                            file: file_name,
                            source,
                        });
                        continue;
                    }
                },
                None => self.stage_local(&file),
            };

            match self.commit(record, store, ticket) {
                Commit::Added(id) => {
                    debug!(id = %id, file = %file_name, "Attachment added");
                    report.committed.push(id);
                }
                Commit::Duplicate(id) => {
                    warn!(id = %id, file = %file_name, "Upload returned an id already in the collection");
                    report.failed.push(AttachmentError::UploadFailed {
                        file: file_name,
                        source: ApiError::InvalidResponse(format!("duplicate id {}", id)),
                    });
                }
                Commit::Stale => {
                    warn!(file = %file_name, "Collection was reset during upload, dropping the rest of the batch");
                    report.suppressed = true;
                    break;
                }
            }
        }

        if !report.committed.is_empty() && !report.suppressed {
            report.collection = store.with_current(ticket, |s| s.snapshot());
        }

        info!(
            committed = report.committed.len(),
            failed = report.failed.len(),
            suppressed = report.suppressed,
            "Upload batch finished"
        );
        report
    }

    async fn upload_remote(&self, owner: &Owner, file: SelectedFile) -> Result<AttachmentRecord, ApiError> {
        let request = UploadRequest {
            owner: owner.clone(),
            role: self.config.role,
            file,
        };
        let image = self.api.upload(request).await?;
        self.server_record(image)
    }

    fn server_record(&self, image: UploadedImage) -> Result<AttachmentRecord, ApiError> {
        let id = AttachmentId::server(image.id.clone());
        if id.namespace() != IdNamespace::Server {
            return Err(ApiError::InvalidResponse(format!(
                "server id {} uses a reserved prefix",
                image.id
            )));
        }
        let url = self
            .config
            .entity
            .resolve_url(&image, &self.config.download_base);
        Ok(AttachmentRecord::new(id, image.name, url))
    }

    fn stage_local(&self, file: &SelectedFile) -> AttachmentRecord {
        let url = self.previews.allocate(file);
        AttachmentRecord::new(AttachmentId::temp(), file.display_name(), url)
    }

    /// Append, or replace in single-slot mode, if the ticket is still current
    fn commit(&self, record: AttachmentRecord, store: &LiveStore, ticket: Ticket) -> Commit {
        let ephemeral_url = record.is_ephemeral().then(|| record.url.clone());
        let slot_kind = self.config.slot_kind();
        let previews = self.previews;

        let outcome = store.with_current(ticket, |s| {
            if s.contains(&record.id) {
                return Commit::Duplicate(record.id);
            }
            let id = record.id.clone();
            match slot_kind {
                SlotKind::Single => {
                    for displaced in s.clear().iter().filter(|r| r.is_ephemeral()) {
                        previews.release(&displaced.url);
                    }
                    s.replace_all(vec![record]);
                }
                SlotKind::Multi => {
                    s.append(record);
                }
            }
            Commit::Added(id)
        });

        match outcome {
            Some(Commit::Duplicate(id)) => {
                if let Some(url) = ephemeral_url {
                    self.previews.release(&url);
                }
                Commit::Duplicate(id)
            }
            Some(commit) => commit,
            None => {
                if let Some(url) = ephemeral_url {
                    self.previews.release(&url);
                }
                Commit::Stale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockImageApi;
    use crate::model::{EntityKind, ImageRole};
    use crate::preview::MemoryPreviewUrls;
    use crate::store::AttachmentStore;
    use mockall::Sequence;
    use mp_core::FILENAME_FIELD;

    fn config(entity: EntityKind, role: ImageRole, owner: Option<&str>) -> EngineConfig {
        let mut config = EngineConfig::new(entity, role);
        config.owner_id = owner.map(str::to_string);
        config
    }

    fn files(names: &[&str]) -> Vec<SelectedFile> {
        names
            .iter()
            .map(|n| SelectedFile::new(*n, vec![0u8; 8]))
            .collect()
    }

    fn image(id: &str, path: &str) -> UploadedImage {
        UploadedImage {
            id: id.to_string(),
            name: id.to_string(),
            path: path.to_string(),
        }
    }

    fn ids(records: &[AttachmentRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_mode_stages_locally() {
        let api = MockImageApi::new();
        let previews = MemoryPreviewUrls::new();
        let config = config(EntityKind::Producer, ImageRole::Portfolio, None);
        let store = LiveStore::default();
        let coordinator = UploadCoordinator::new(&api, &previews, &config);

        let ticket = store.ticket().unwrap();
        let report = coordinator
            .upload(files(&["front.png", "back.png"]), &store, ticket)
            .await;

        assert_eq!(report.committed.len(), 2);
        let collection = report.collection.unwrap();
        assert!(collection.iter().all(|r| r.is_ephemeral()));
        assert_eq!(collection[0].name, "front");
        assert_eq!(collection[1].name, "back");
        assert_eq!(previews.live_count(), 2);
    }

    #[tokio::test]
    async fn test_uploads_in_selection_order() {
        let mut api = MockImageApi::new();
        let mut seq = Sequence::new();
        for (file, id) in [("a.png", "srv-a"), ("b.png", "srv-b"), ("c.png", "srv-c")] {
            api.expect_upload()
                .withf(move |r| r.file.name == file && r.owner.id == "p-1")
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(image(id, &format!("https://cdn.example.com/{}", file))));
        }
        let previews = MemoryPreviewUrls::new();
        let config = config(EntityKind::Producer, ImageRole::Portfolio, Some("p-1"));
        let store = LiveStore::default();
        let coordinator = UploadCoordinator::new(&api, &previews, &config);

        let ticket = store.ticket().unwrap();
        let report = coordinator
            .upload(files(&["a.png", "b.png", "c.png"]), &store, ticket)
            .await;

        assert_eq!(
            ids(&report.collection.unwrap()),
            vec!["srv-a", "srv-b", "srv-c"]
        );
        assert_eq!(previews.allocated(), 0);
    }

    #[tokio::test]
    async fn test_failed_file_is_skipped() {
        let mut api = MockImageApi::new();
        api.expect_upload()
            .withf(|r| r.file.name == "broken.png")
            .returning(|_| Err(ApiError::Http { status: 413, message: "too large".to_string() }));
        api.expect_upload()
            .withf(|r| r.file.name != "broken.png")
            .returning(|r| Ok(image(&format!("srv-{}", r.file.display_name()), "/p.png")));
        let previews = MemoryPreviewUrls::new();
        let config = config(EntityKind::Item, ImageRole::Item, Some("item-1"));
        let store = LiveStore::default();
        let coordinator = UploadCoordinator::new(&api, &previews, &config);

        let ticket = store.ticket().unwrap();
        let report = coordinator
            .upload(files(&["ok1.png", "broken.png", "ok2.png"]), &store, ticket)
            .await;

        assert_eq!(ids(&report.collection.unwrap()), vec!["srv-ok1", "srv-ok2"]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            &report.failed[0],
            AttachmentError::UploadFailed { file, .. } if file == "broken.png"
        ));
    }

    #[tokio::test]
    async fn test_item_urls_use_download_route() {
        let mut api = MockImageApi::new();
        api.expect_upload()
            .returning(|_| Ok(image("abc", "uploads/abc.png")));
        let previews = MemoryPreviewUrls::new();
        let mut config = config(EntityKind::Item, ImageRole::Item, Some("item-1"));
        config.download_base = "https://shop.example.com".to_string();
        let store = LiveStore::default();
        let coordinator = UploadCoordinator::new(&api, &previews, &config);

        let ticket = store.ticket().unwrap();
        let report = coordinator.upload(files(&["x.png"]), &store, ticket).await;

        let collection = report.collection.unwrap();
        assert_eq!(
            collection[0].url,
            "https://shop.example.com/api/v1/images/download/abc"
        );
    }

    #[tokio::test]
    async fn test_duplicate_and_reserved_server_ids_fail() {
        let mut api = MockImageApi::new();
        api.expect_upload()
            .withf(|r| r.file.name == "dup.png")
            .returning(|_| Ok(image("srv-1", "/1.png")));
        api.expect_upload()
            .withf(|r| r.file.name == "sneaky.png")
            .returning(|_| Ok(image("temp-123", "/t.png")));
        let previews = MemoryPreviewUrls::new();
        let config = config(EntityKind::Producer, ImageRole::Portfolio, Some("p-1"));
        let existing = AttachmentRecord::new(AttachmentId::server("srv-1"), "one", "/1.png");
        let store = LiveStore::new(AttachmentStore::with_records(vec![existing]));
        let coordinator = UploadCoordinator::new(&api, &previews, &config);

        let ticket = store.ticket().unwrap();
        let report = coordinator
            .upload(files(&["dup.png", "sneaky.png"]), &store, ticket)
            .await;

        assert!(report.committed.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report.collection.is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_single_slot_replaces_and_releases() {
        let api = MockImageApi::new();
        let previews = MemoryPreviewUrls::new();
        let config = config(EntityKind::Producer, ImageRole::Logo, None);
        let store = LiveStore::default();
        let coordinator = UploadCoordinator::new(&api, &previews, &config);

        let ticket = store.ticket().unwrap();
        coordinator.upload(files(&["old.png"]), &store, ticket).await;
        let old_url = store.snapshot()[0].url.clone();

        let report = coordinator.upload(files(&["new.png"]), &store, ticket).await;

        let collection = report.collection.unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection[0].name, "new");
        assert!(!previews.is_live(&old_url));
        assert_eq!(previews.released(), 1);
        assert_eq!(previews.live_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_ticket_suppresses_and_releases() {
        let api = MockImageApi::new();
        let previews = MemoryPreviewUrls::new();
        let config = config(EntityKind::Producer, ImageRole::Portfolio, None);
        let store = LiveStore::default();
        let coordinator = UploadCoordinator::new(&api, &previews, &config);

        let ticket = store.ticket().unwrap();
        store.reset();
        let report = coordinator
            .upload(files(&["a.png", "b.png"]), &store, ticket)
            .await;

        assert!(report.suppressed);
        assert!(report.committed.is_empty());
        assert!(store.is_empty());
        assert_eq!(previews.allocated(), 1);
        assert_eq!(previews.released(), 1);
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn test_validate_uses_config_limits() {
        let api = MockImageApi::new();
        let previews = MemoryPreviewUrls::new();
        let mut config = config(EntityKind::Item, ImageRole::Item, None);
        config.max_files = 3;
        let coordinator = UploadCoordinator::new(&api, &previews, &config);

        assert!(coordinator.validate(&files(&["a.png", "b.png"]), 1).is_ok());
        assert!(coordinator.validate(&files(&["a.png", "b.png"]), 2).is_err());

        match coordinator.validate(&files(&["a,b.png"]), 0) {
            Err(AttachmentError::ValidationRejected(errors)) => {
                assert!(errors.has_error(FILENAME_FIELD))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
