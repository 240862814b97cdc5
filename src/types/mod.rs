//! Shared Types
//!
//! Error types and small cross-cutting value types.

pub mod error;

pub use error::{DossierError, Result};
