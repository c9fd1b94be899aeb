//! Base contract system

use mp_core::error::ValidationErrors;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// Base contract trait
pub trait Contract<T: ?Sized>: Send + Sync {
    /// Validate the entity
    fn validate(&self, entity: &T) -> ValidationResult;
}

/// A file offered for upload, as seen by contracts
///
/// Contracts only need the name; the bytes stay with the caller.
pub trait FileCandidate {
    fn file_name(&self) -> &str;
}

impl FileCandidate for str {
    fn file_name(&self) -> &str {
        self
    }
}

impl FileCandidate for String {
    fn file_name(&self) -> &str {
        self.as_str()
    }
}

impl<T: FileCandidate + ?Sized> FileCandidate for &T {
    fn file_name(&self) -> &str {
        (**self).file_name()
    }
}

// ============================================================================
// Tests
// ============================================================================
