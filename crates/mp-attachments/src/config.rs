//! Engine configuration
//!
//! Fixed at construction and never changed for the engine's lifetime.

use mp_core::UploadLimits;

use crate::model::{EntityKind, ImageRole, Owner, SerializationKind, SlotKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub entity: EntityKind,
    pub role: ImageRole,
    /// Owning entity id; `None` while the entity has not been created
    pub owner_id: Option<String>,
    pub max_files: usize,
    pub max_filename_length: usize,
    pub serialization: SerializationKind,
    /// Prefix for item download urls (empty keeps them relative)
    pub download_base: String,
}

impl EngineConfig {
    /// Defaults derived from the entity and role
    pub fn new(entity: EntityKind, role: ImageRole) -> Self {
        let limits = UploadLimits::default();
        Self {
            entity,
            role,
            owner_id: None,
            max_files: role.slot_kind().default_max(&limits),
            max_filename_length: limits.max_filename_length,
            serialization: entity.serialization_kind(),
            download_base: String::new(),
        }
    }

    pub fn slot_kind(&self) -> SlotKind {
        self.role.slot_kind()
    }

    pub fn owner(&self) -> Option<Owner> {
        self.owner_id.as_ref().map(|id| Owner {
            entity: self.entity,
            id: id.clone(),
        })
    }

    /// Create mode: uploads are previewed locally
    pub fn is_create_mode(&self) -> bool {
        self.owner_id.is_none()
    }
}
