//! Utilities for SchemaDrift
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod version;

// Re-export key utility functions
pub use logging::init_logging;
pub use version::{compare_versions, version_at_least};
