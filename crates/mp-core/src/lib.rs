//! # mp-core
//!
//! Core types shared by the marketplace image crates.
//!
//! - Validation error collection
//! - Configuration types and environment loading

pub mod config;
pub mod error;

pub use config::{ApiConfig, AppConfig, ConfigError, UploadLimits};
pub use error::*;
