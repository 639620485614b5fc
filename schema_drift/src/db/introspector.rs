//! Schema introspection interface
//!
//! An introspector reports the raw metadata of live tables. Querying an actual
//! database is left to implementations of [`Introspector`]; this crate ships
//! [`MemoryIntrospector`] for snapshots captured as JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};
use crate::schema::column::ColumnType;
use crate::schema::dialect::Dialect;

/// Source of live table metadata
pub trait Introspector {
    /// Dialect of the inspected database
    fn dialect(&self) -> Dialect;

    /// Server version, when known
    fn engine_version(&self) -> Option<String> {
        None
    }

    /// Names of all tables in the database
    fn table_names(&self) -> Result<Vec<String>>;

    /// Metadata of a table, `None` when the table does not exist
    fn table_metadata(&self, table: &str) -> Result<Option<TableMetadata>>;
}

/// Raw metadata of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
    #[serde(default)]
    pub primary_key: Option<PrimaryKeyMetadata>,
    #[serde(default)]
    pub indexes: Vec<IndexMetadata>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyMetadata>,
}

/// Raw metadata of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Character or display size; `-1` stands for `max`
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub default_expression: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub unsigned: bool,
    #[serde(default)]
    pub comment: Option<String>,
    /// Extra definition text reported by the engine (collation, generated columns)
    #[serde(default)]
    pub extra: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMetadata {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            size: None,
            precision: None,
            scale: None,
            nullable: true,
            default: None,
            default_expression: None,
            unique: false,
            primary_key: false,
            auto_increment: false,
            unsigned: false,
            comment: None,
            extra: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyMetadata {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    /// Index backing the primary key
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyMetadata {
    pub name: String,
    pub columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
}

/// Snapshot of a live database as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub dialect: Dialect,
    #[serde(default)]
    pub engine_version: Option<String>,
    pub tables: Vec<TableMetadata>,
}

/// Introspector serving metadata from memory
#[derive(Debug, Clone)]
pub struct MemoryIntrospector {
    dialect: Dialect,
    engine_version: Option<String>,
    tables: IndexMap<String, TableMetadata>,
}

impl MemoryIntrospector {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            engine_version: None,
            tables: IndexMap::new(),
        }
    }

    pub fn with_engine_version(mut self, engine_version: &str) -> Self {
        self.engine_version = Some(engine_version.to_string());
        self
    }

    /// Register a table, replacing any table of the same name
    pub fn add_table(&mut self, table: TableMetadata) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn from_snapshot(snapshot: LiveSnapshot) -> Self {
        let mut introspector = Self::new(snapshot.dialect);
        introspector.engine_version = snapshot.engine_version;
        for table in snapshot.tables {
            introspector.add_table(table);
        }
        introspector
    }

    /// Load a snapshot from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| Error::IntrospectionError(format!("Failed to read live snapshot: {}", e)))?;
        let snapshot: LiveSnapshot = serde_json::from_str(&json)
            .map_err(|e| Error::IntrospectionError(format!("Failed to parse live snapshot: {}", e)))?;

        tracing::debug!(path, tables = snapshot.tables.len(), "Loaded live snapshot");
        Ok(Self::from_snapshot(snapshot))
    }
}

impl Introspector for MemoryIntrospector {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn engine_version(&self) -> Option<String> {
        self.engine_version.clone()
    }

    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn table_metadata(&self, table: &str) -> Result<Option<TableMetadata>> {
        Ok(self.tables.get(table).cloned())
    }
}
