//! Database module for SchemaDrift
//!
//! This module defines the introspection interface and maps live table
//! metadata into structures.

pub mod introspector;
pub mod mapper;

// Re-export key types
pub use introspector::{
    ColumnMetadata, ForeignKeyMetadata, IndexMetadata, Introspector, LiveSnapshot, MemoryIntrospector,
    PrimaryKeyMetadata, TableMetadata,
};
pub use mapper::TableMapper;
