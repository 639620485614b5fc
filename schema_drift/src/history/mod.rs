//! History module for SchemaDrift
//!
//! This module decodes recorded structure changes and replays them into the
//! structure a table's migration history declares.

pub mod builder;
pub mod change;
pub mod store;

// Re-export key types
pub use builder::StructureBuilder;
pub use change::{ChangeMethod, ChangeValue, RawChange, StructureChange};
pub use store::{HistoryStore, MemoryHistory};
