//! Attachment Model
//!
//! Records, identifiers, and the closed sets of kinds that parameterize the
//! engine.

use std::path::Path;

use bytes::Bytes;
use chrono::Utc;
use mp_contracts::FileCandidate;
use mp_core::UploadLimits;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id prefix for records hydrated from a persisted entity
pub const EXISTING_PREFIX: &str = "existing-";
/// Id prefix for records previewed locally and not yet uploaded
pub const TEMP_PREFIX: &str = "temp-";

/// Which of the three id namespaces an id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdNamespace {
    Existing,
    Temp,
    Server,
}

/// Attachment identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(String);

impl AttachmentId {
    /// Positional id for a hydrated record
    pub fn existing(seq: usize) -> Self {
        Self(format!("{}{}", EXISTING_PREFIX, seq))
    }

    /// Fresh id for a locally previewed record
    pub fn temp() -> Self {
        Self(format!(
            "{}{}-{}",
            TEMP_PREFIX,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    /// Id issued by the server for a completed upload
    pub fn server(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> IdNamespace {
        if self.0.starts_with(EXISTING_PREFIX) {
            IdNamespace::Existing
        } else if self.0.starts_with(TEMP_PREFIX) {
            IdNamespace::Temp
        } else {
            IdNamespace::Server
        }
    }

    /// Whether the record's url is a local preview that must be released
    pub fn is_ephemeral(&self) -> bool {
        self.namespace() == IdNamespace::Temp
    }
}

impl std::fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttachmentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One managed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: AttachmentId,
    /// Display label
    pub name: String,
    /// Local preview reference or durable URL
    pub url: String,
}

impl AttachmentRecord {
    pub fn new(id: AttachmentId, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            url: url.into(),
        }
    }

    /// Hydrated record at position `seq`, named after its url
    pub fn existing(seq: usize, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: AttachmentId::existing(seq),
            name: name_from_url(&url),
            url,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        self.id.is_ephemeral()
    }
}

/// Image persisted for the owning entity, as supplied at mount time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingImage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

impl ExistingImage {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            url: url.into(),
        }
    }

    /// Record for position `seq`; the supplied id is replaced by an `existing-` id
    pub fn into_record(self, seq: usize) -> AttachmentRecord {
        let name = self.name.unwrap_or_else(|| name_from_url(&self.url));
        AttachmentRecord::new(AttachmentId::existing(seq), name, self.url)
    }
}

/// Whether a collection holds one record or many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Single,
    Multi,
}

impl SlotKind {
    /// Default max count when none is configured
    pub fn default_max(&self, limits: &UploadLimits) -> usize {
        match self {
            Self::Single => limits.single_slot_max,
            Self::Multi => limits.multi_slot_max,
        }
    }
}

/// Image-kind tag sent to the upload endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    Logo,
    Portfolio,
    Item,
}

impl ImageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logo => "logo",
            Self::Portfolio => "portfolio",
            Self::Item => "item",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "logo" => Some(Self::Logo),
            "portfolio" => Some(Self::Portfolio),
            "item" => Some(Self::Item),
            _ => None,
        }
    }

    pub fn slot_kind(&self) -> SlotKind {
        match self {
            Self::Logo => SlotKind::Single,
            Self::Portfolio | Self::Item => SlotKind::Multi,
        }
    }
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wire shape the owning form expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationKind {
    /// Urls joined with `,`
    JoinedString,
    /// Urls as a list
    List,
}

/// Kind of entity that owns the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Item,
    Producer,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Producer => "producer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "item" => Some(Self::Item),
            "producer" => Some(Self::Producer),
            _ => None,
        }
    }

    pub fn serialization_kind(&self) -> SerializationKind {
        match self {
            Self::Item => SerializationKind::JoinedString,
            Self::Producer => SerializationKind::List,
        }
    }

    /// Durable url for a completed upload
    ///
    /// Item images are served through the download route unless the server
    /// already returned an absolute url. Producer paths are used as-is.
    pub fn resolve_url(&self, image: &UploadedImage, download_base: &str) -> String {
        match self {
            Self::Item if !image.path.starts_with("http") => format!(
                "{}/api/v1/images/download/{}",
                download_base.trim_end_matches('/'),
                image.id
            ),
            _ => image.path.clone(),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The entity an upload is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub entity: EntityKind,
    pub id: String,
}

/// Body returned by the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: String,
    pub name: String,
    pub path: String,
}

/// A file picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();
        Self {
            name,
            content_type,
            data: data.into(),
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("no usable file name in {}", path.display()),
                )
            })?
            .to_string();
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, data))
    }

    /// Label shown for a local file: the name up to its first dot
    pub fn display_name(&self) -> String {
        stem(&self.name).to_string()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl FileCandidate for SelectedFile {
    fn file_name(&self) -> &str {
        &self.name
    }
}

/// Display name for a url: its last path segment up to the first dot
pub fn name_from_url(url: &str) -> String {
    let last = url.rsplit('/').next().unwrap_or(url);
    stem(last).to_string()
}

fn stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}
