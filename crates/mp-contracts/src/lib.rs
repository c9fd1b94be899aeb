//! # mp-contracts
//!
//! Contract validation for the marketplace image engine.
//!
//! Contracts check candidate input before any side effect happens and report
//! every problem they find as `ValidationErrors`.

pub mod base;
pub mod images;

pub use base::*;
