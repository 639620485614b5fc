//! SchemaDrift: detects drift between live database tables and their migration history
//!
//! SchemaDrift replays the structure changes recorded by applied migrations into
//! the structure each table should have, maps the live table into the same
//! shape, and describes every difference in a [`Blueprint`] from which a
//! corrective migration can be rendered.

pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::{Introspector, MemoryIntrospector, TableMapper};
pub use error::{Error, Result};
pub use history::{HistoryStore, MemoryHistory, StructureBuilder, StructureChange};
pub use schema::{Arrangement, Arranger, Blueprint, ColumnRenderer, Comparator, Dialect, Structure};

/// Start a client builder with the configuration read from a file
pub fn init(config_path: &str) -> Result<DriftClientBuilder> {
    let config = config::load_from_file(config_path)?;
    Ok(DriftClient::builder().config(config))
}

/// The main client for comparing tables against their history
pub struct DriftClient {
    config: Config,
    introspector: Box<dyn Introspector>,
    history: Box<dyn HistoryStore>,
}

/// Builder for [`DriftClient`]
#[derive(Default)]
pub struct DriftClientBuilder {
    config: Option<Config>,
    introspector: Option<Box<dyn Introspector>>,
    history: Option<Box<dyn HistoryStore>>,
}

impl DriftClientBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn introspector(mut self, introspector: impl Introspector + 'static) -> Self {
        self.introspector = Some(Box::new(introspector));
        self
    }

    pub fn history(mut self, history: impl HistoryStore + 'static) -> Self {
        self.history = Some(Box::new(history));
        self
    }

    /// Build the client; both collaborators are required
    pub fn build(self) -> Result<DriftClient> {
        let introspector = self
            .introspector
            .ok_or_else(|| Error::ConfigError("No schema introspector configured".to_string()))?;
        let history = self
            .history
            .ok_or_else(|| Error::ConfigError("No history store configured".to_string()))?;
        let config = self.config.unwrap_or_default();

        if config.comparison.dialect != introspector.dialect() {
            tracing::warn!(
                configured = %config.comparison.dialect,
                database = %introspector.dialect(),
                "Configured dialect differs from the database, using the database dialect"
            );
        }

        Ok(DriftClient {
            config,
            introspector,
            history,
        })
    }
}

impl DriftClient {
    pub fn builder() -> DriftClientBuilder {
        DriftClientBuilder::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.introspector.dialect()
    }

    /// Engine version from the configuration, else as reported by the database
    pub fn engine_version(&self) -> Option<String> {
        self.config
            .comparison
            .engine_version
            .clone()
            .or_else(|| self.introspector.engine_version())
    }

    fn table_prefix(&self) -> Option<&str> {
        self.config.naming.as_ref().and_then(|naming| naming.table_prefix.as_deref())
    }

    /// Renderer matching the configured portability
    pub fn renderer(&self) -> ColumnRenderer {
        ColumnRenderer::new(self.config.comparison.portable)
    }

    /// Table name as it should appear in a generated migration
    pub fn render_table_name(&self, structure: &Structure) -> String {
        let use_prefix = self.config.naming.as_ref().map_or(false, |naming| naming.use_prefix);
        structure.render_name(use_prefix)
    }

    /// Structure of the table as it exists in the database
    pub fn live_structure(&self, table: &str) -> Result<Structure> {
        let metadata = self
            .introspector
            .table_metadata(table)?
            .ok_or_else(|| Error::IntrospectionError(format!("Table '{}' does not exist", table)))?;
        let engine_version = self.engine_version();

        TableMapper::new(self.dialect())
            .engine_version(engine_version.as_deref())
            .prefix(self.table_prefix())
            .map(&metadata)
    }

    /// Structure of the table as declared by its recorded changes
    pub fn declared_structure(&self, table: &str) -> Result<Structure> {
        let changes = self.history.changes(table)?;
        let engine_version = self.engine_version();

        StructureBuilder::new(self.dialect())
            .engine_version(engine_version.as_deref())
            .prefix(self.table_prefix())
            .build(table, &changes)
    }

    /// Compare one table against its history
    pub fn compare_table(&self, table: &str) -> Result<Blueprint> {
        let current = self.live_structure(table)?;
        let declared = self.declared_structure(table)?;

        Ok(Comparator::new(self.config.comparison.portable).compare(&current, &declared))
    }

    /// Order tables by their live foreign key references
    pub fn arrange(&self, tables: &[String]) -> Result<Arrangement> {
        let mut arranger = Arranger::new();
        for table in tables {
            let structure = self.live_structure(table)?;
            arranger.add_table(table, structure.foreign_keys().values().cloned().collect());
        }
        Ok(arranger.arrange())
    }

    /// Compare several tables, in creation order
    pub fn compare_tables(&self, tables: &[String]) -> Result<Vec<Blueprint>> {
        let arrangement = self.arrange(tables)?;
        arrangement
            .tables
            .iter()
            .map(|table| self.compare_table(table))
            .collect()
    }

    /// Names of all live tables
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.introspector.table_names()
    }
}
