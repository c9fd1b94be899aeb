//! Subcommand implementations
//!
//! Each command builds an engine for the target collection and returns the
//! JSON document printed by the binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use mp_attachments::{
    AttachmentId, EngineBuilder, ExistingImage, ImageApi, MemoryImageApi, MemoryPreviewUrls,
    SelectedFile,
};
use mp_contracts::images::UploadBatchContract;
use mp_contracts::Contract;
use mp_core::AppConfig;
use serde_json::{json, Value};
use tracing::info;

use crate::args::Target;

fn builder(target: &Target, config: &AppConfig) -> EngineBuilder {
    let mut builder = EngineBuilder::new(target.entity, target.role)
        .limits(&config.uploads)
        .download_base(config.api.base_url.clone())
        .existing_images(
            target
                .existing
                .iter()
                .filter(|url| !url.is_empty())
                .map(ExistingImage::from_url)
                .collect(),
        );
    if let Some(owner) = &target.owner {
        builder = builder.owner(owner.clone());
    }
    if let Some(max_files) = target.max_files {
        builder = builder.max_files(max_files);
    }
    builder
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Check names and count of `files` against the target collection
pub fn validate(target: &Target, config: &AppConfig, files: &[PathBuf]) -> Value {
    let engine_config = builder(target, config).config().clone();
    let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
    let existing = target.existing.iter().filter(|url| !url.is_empty()).count();

    let result = UploadBatchContract::new(existing, engine_config.max_files)
        .with_max_filename_length(engine_config.max_filename_length)
        .validate(names.as_slice());

    match result {
        Ok(()) => json!({ "valid": true, "files": names }),
        Err(errors) => json!({
            "valid": false,
            "files": names,
            "errors": errors.full_messages(),
        }),
    }
}

pub async fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<SelectedFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = SelectedFile::from_path(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}

/// Upload `files` through `api` and report the resulting collection
pub async fn upload<A>(
    target: &Target,
    config: &AppConfig,
    api: Arc<A>,
    files: Vec<SelectedFile>,
) -> anyhow::Result<Value>
where
    A: ImageApi + 'static,
{
    let (engine, _reset) = builder(target, config).build(api, Arc::new(MemoryPreviewUrls::new()));
    let report = engine.upload(files).await?;

    let failed: Vec<Value> = report
        .failed
        .iter()
        .map(|e| json!({ "title": e.title(), "message": e.to_string() }))
        .collect();
    info!(
        committed = report.committed.len(),
        failed = failed.len(),
        "Upload finished"
    );

    Ok(json!({
        "value": engine.value(),
        "records": engine.snapshot(),
        "committed": report.committed,
        "failed": failed,
    }))
}

/// Apply a drag from position `from` onto position `to`
pub fn reorder(target: &Target, config: &AppConfig, from: usize, to: usize) -> Value {
    let (engine, _reset) =
        builder(target, config).build(Arc::new(MemoryImageApi::new()), Arc::new(MemoryPreviewUrls::new()));
    let changed = engine.reorder(&AttachmentId::existing(from), &AttachmentId::existing(to));
    json!({ "changed": changed, "value": engine.value() })
}
