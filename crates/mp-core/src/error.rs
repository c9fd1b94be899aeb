//! Core error types shared by the marketplace image crates
//!
//! Validation failures are collected rather than raised one at a time, so a
//! rejected batch can report every offending file at once.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Field key for errors about the batch as a whole (count limits)
pub const FILES_FIELD: &str = "files";

/// Field key for errors about an individual file name
pub const FILENAME_FIELD: &str = "filename";

/// Validation errors collection
///
/// Field errors are kept in key order so messages render deterministically.
#[derive(Error, Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: BTreeMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get errors for a specific field
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    /// Total number of messages across all fields
    pub fn len(&self) -> usize {
        self.base_errors.len() + self.errors.values().map(Vec::len).sum::<usize>()
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    /// Messages ready to show to a user, base errors first
    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for field_messages in self.errors.values() {
            messages.extend(field_messages.iter().cloned());
        }
        messages
    }

    /// Convert into a `Result`, `Ok` when nothing was collected
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join("; "))
    }
}
