//! Contracts for image attachments

mod upload;

pub use upload::{check_file_name, NameViolation, UploadBatchContract};
