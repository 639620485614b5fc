//! Schema module for SchemaDrift
//!
//! This module holds the column model, table structures, and the comparison
//! and arrangement of structures.

pub mod arranger;
pub mod blueprint;
pub mod column;
pub mod comparator;
pub mod dialect;
pub mod render;
pub mod types;

// Re-export key types
pub use arranger::{Arrangement, Arranger};
pub use blueprint::Blueprint;
pub use column::{Column, ColumnType, DefaultValue, Size};
pub use comparator::{compare, Comparator};
pub use dialect::Dialect;
pub use render::ColumnRenderer;
pub use types::{Constraint, ForeignKey, Index, PrimaryKey, ReferenceAction, Structure};
