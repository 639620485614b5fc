//! Configuration handling for SchemaDrift

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::dialect::Dialect;

/// Load configuration from a TOML or YAML file
///
/// Files ending in `.yaml` or `.yml` are read as YAML, everything else as TOML.
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let is_yaml = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let config: Config = if is_yaml {
        serde_yaml::from_str(&config_str)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?
    } else {
        toml::from_str(&config_str)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?
    };

    Ok(config)
}

/// Represents the complete SchemaDrift configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub comparison: ComparisonConfig,
    pub naming: Option<NamingConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Comparison behavior configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ComparisonConfig {
    pub dialect: Dialect,
    pub engine_version: Option<String>,
    #[serde(default = "default_portable")]
    pub portable: bool,
}

fn default_portable() -> bool {
    true
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::MySql,
            engine_version: None,
            portable: true,
        }
    }
}

/// Table naming configuration used when rendering table names
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamingConfig {
    pub table_prefix: Option<String>,
    pub use_prefix: bool,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_toml_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [comparison]
            dialect = "pgsql"
            engine_version = "14.2"

            [naming]
            table_prefix = "app_"
            use_prefix = true
            "#
        )
        .unwrap();

        let config = load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.comparison.dialect, Dialect::PostgreSql);
        assert_eq!(config.comparison.engine_version.as_deref(), Some("14.2"));
        assert!(config.comparison.portable);
        assert_eq!(config.naming.unwrap().table_prefix.as_deref(), Some("app_"));
        assert!(config.logging.is_none());
    }

    #[test]
    fn loads_yaml_config() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "comparison:\n  dialect: sqlite\n  portable: false\nlogging:\n  level: debug\n  format: json\n  stdout: true\n"
        )
        .unwrap();

        let config = load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.comparison.dialect, Dialect::Sqlite);
        assert!(!config.comparison.portable);
        assert_eq!(config.logging.unwrap().format, "json");
    }

    #[test]
    fn rejects_unknown_dialect() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[comparison]\ndialect = \"db2\"").unwrap();

        let err = load_from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
