//! Upload batch contract
//!
//! Checks a whole selection before any network call is issued. A batch that
//! fails here is discarded in full.

use mp_core::error::{ValidationErrors, FILENAME_FIELD, FILES_FIELD};
use mp_core::UploadLimits;

use crate::base::{Contract, FileCandidate, ValidationResult};

/// Why a single file name was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameViolation {
    ContainsComma,
    ContainsSlash,
    TooLong { length: usize, max: usize },
}

/// Check one file name against the naming rules
///
/// `,` separates fields and `/` separates path segments downstream. Length
/// is counted in UTF-16 code units, as browsers report it.
pub fn check_file_name(name: &str, max_length: usize) -> Option<NameViolation> {
    if name.contains(',') {
        return Some(NameViolation::ContainsComma);
    }
    if name.contains('/') {
        return Some(NameViolation::ContainsSlash);
    }
    let length = name.encode_utf16().count();
    if length > max_length {
        return Some(NameViolation::TooLong {
            length,
            max: max_length,
        });
    }
    None
}

/// Contract for a batch of files about to be added to a collection
#[derive(Debug, Clone, Copy)]
pub struct UploadBatchContract {
    current_count: usize,
    max_count: usize,
    max_filename_length: usize,
}

impl UploadBatchContract {
    pub fn new(current_count: usize, max_count: usize) -> Self {
        Self {
            current_count,
            max_count,
            max_filename_length: UploadLimits::default().max_filename_length,
        }
    }

    pub fn with_max_filename_length(mut self, max: usize) -> Self {
        self.max_filename_length = max;
        self
    }

    fn validate_count(&self, batch_size: usize, errors: &mut ValidationErrors) {
        if self.current_count + batch_size > self.max_count {
            errors.add(
                FILES_FIELD,
                format!(
                    "You can only upload {} image(s); {} already present, {} selected",
                    self.max_count, self.current_count, batch_size
                ),
            );
        }
    }

    fn validate_name(&self, name: &str, errors: &mut ValidationErrors) {
        if check_file_name(name, self.max_filename_length).is_some() {
            errors.add(
                FILENAME_FIELD,
                format!(
                    "The file name \"{}\" is not allowed. It must not contain commas or \
                     slashes, or exceed {} characters.",
                    name, self.max_filename_length
                ),
            );
        }
    }
}

impl<F: FileCandidate> Contract<[F]> for UploadBatchContract {
    fn validate(&self, files: &[F]) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        self.validate_count(files.len(), &mut errors);
        for file in files {
            self.validate_name(file.file_name(), &mut errors);
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_batch() {
        let contract = UploadBatchContract::new(1, 10);
        assert!(contract.validate(&names(&["a.png", "b.jpg"])[..]).is_ok());
    }

    #[test]
    fn test_comma_rejects_whole_batch() {
        let contract = UploadBatchContract::new(0, 10);
        let result = contract.validate(&names(&["a.png", "b,c.png", "d.png"])[..]);

        let errors = result.unwrap_err();
        assert!(errors.has_error(FILENAME_FIELD));
        assert!(!errors.has_error(FILES_FIELD));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_slash_rejected() {
        assert_eq!(
            check_file_name("dir/file.png", 100),
            Some(NameViolation::ContainsSlash)
        );
    }

    #[test]
    fn test_length_boundary() {
        let exactly = "x".repeat(100);
        let over = "x".repeat(101);
        assert_eq!(check_file_name(&exactly, 100), None);
        assert_eq!(
            check_file_name(&over, 100),
            Some(NameViolation::TooLong { length: 101, max: 100 })
        );
    }

    #[test]
    fn test_length_counts_utf16_units() {
        let accented = "é".repeat(100);
        assert_eq!(check_file_name(&accented, 100), None);

        let emoji = "\u{1F4F7}".repeat(50);
        assert_eq!(check_file_name(&emoji, 100), None);
        let over = format!("{}x", emoji);
        assert_eq!(
            check_file_name(&over, 100),
            Some(NameViolation::TooLong { length: 101, max: 100 })
        );
    }

    #[test]
    fn test_count_limit() {
        let contract = UploadBatchContract::new(9, 10);
        assert!(contract.validate(&names(&["a.png"])[..]).is_ok());

        let errors = contract
            .validate(&names(&["a.png", "b.png"])[..])
            .unwrap_err();
        assert!(errors.has_error(FILES_FIELD));
    }

    #[test]
    fn test_single_slot_full() {
        let contract = UploadBatchContract::new(1, 1);
        assert!(contract.validate(&names(&["logo.png"])[..]).is_err());
    }

    #[test]
    fn test_custom_filename_length() {
        let contract = UploadBatchContract::new(0, 10).with_max_filename_length(5);
        assert!(contract.validate(&names(&["a.png"])[..]).is_ok());
        assert!(contract.validate(&names(&["ab.png"])[..]).is_err());
    }

    #[test]
    fn test_reports_every_offender() {
        let contract = UploadBatchContract::new(0, 1);
        let errors = contract
            .validate(&names(&["a,b", "c/d"])[..])
            .unwrap_err();
        assert_eq!(errors.get(FILENAME_FIELD).map(Vec::len), Some(2));
        assert!(errors.has_error(FILES_FIELD));
    }
}
