//! Error types for SchemaDrift

use thiserror::Error;

/// Result type for SchemaDrift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SchemaDrift
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown structure change method: {0}")]
    UnknownMethod(String),

    #[error("Wrong data for '{method}' change ({reason}): {data}")]
    DecodeError {
        method: String,
        data: serde_json::Value,
        reason: String,
    },

    #[error("Introspection error: {0}")]
    IntrospectionError(String),

    #[error("History error: {0}")]
    HistoryError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Build a decode error for the payload of a structure change
    pub fn decode(method: impl Into<String>, data: &serde_json::Value, reason: impl ToString) -> Self {
        Error::DecodeError {
            method: method.into(),
            data: data.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Convert Serde JSON errors to SchemaDrift errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert YAML errors to SchemaDrift errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to SchemaDrift errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
