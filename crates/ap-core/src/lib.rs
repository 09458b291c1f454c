//! ap-core: shared types, errors, and configuration for audiopress.
//!
//! This crate is the foundational dependency for the other ap-* crates,
//! providing the unified classified error type, the converter configuration,
//! and the media-domain payload types.

pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use config::ConverterConfig;
pub use error::{Error, Result};
pub use media::{AudioPayload, MediaType};
