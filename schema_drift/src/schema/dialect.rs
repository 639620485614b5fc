//! SQL dialects and their column capability profiles
//!
//! Every per-dialect rule the column model needs (which kinds of length are
//! kept, fractional seconds support, the spelling of identity markers in a
//! column's append text) is answered from a single [`DialectProfile`] rather
//! than from conditionals spread across column types.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::schema::column::{ColumnType, LengthKind};
use crate::utils::version::version_at_least;

/// Marker for a primary key in a column's append text, shared by all dialects
pub const PRIMARY_KEY_MARKER: &str = "PRIMARY KEY";

/// Minimum MySQL server version with fractional seconds for temporal types
pub const MYSQL_FRACTIONAL_SECONDS_VERSION: &str = "5.6.4";

static DEFAULT_LENGTH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\((\d+(,\d+)*|max)\)").expect("valid default length pattern"));

/// Supported SQL engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dialect {
    Cubrid,
    MsSql,
    MySql,
    Oracle,
    PostgreSql,
    Sqlite,
}

/// Fractional seconds support for temporal columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractionalSeconds {
    Never,
    Always,
    Since(&'static str),
}

/// Where the auto increment marker sits relative to the primary key marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOrder {
    IdentityFirst,
    PrimaryKeyFirst,
}

/// Capabilities of a dialect relevant to column definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectProfile {
    /// Integer display width survives introspection (`int(11)`)
    pub display_width: bool,
    /// Decimal and money precision/scale are reported
    pub decimal_length: bool,
    /// Float and double carry an explicit precision
    pub float_precision: bool,
    /// Large object types report a length, including the `max` sentinel
    pub max_sentinel: bool,
    pub fractional_seconds: FractionalSeconds,
    /// Spelling of the auto increment marker in append text
    pub identity_marker: Option<&'static str>,
    pub marker_order: MarkerOrder,
}

impl Dialect {
    pub const ALL: [Dialect; 6] = [
        Dialect::Cubrid,
        Dialect::MsSql,
        Dialect::MySql,
        Dialect::Oracle,
        Dialect::PostgreSql,
        Dialect::Sqlite,
    ];

    /// Canonical short name of the dialect
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Cubrid => "cubrid",
            Dialect::MsSql => "mssql",
            Dialect::MySql => "mysql",
            Dialect::Oracle => "oci",
            Dialect::PostgreSql => "pgsql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Capability profile of the dialect
    pub fn profile(&self) -> DialectProfile {
        match self {
            Dialect::Cubrid => DialectProfile {
                display_width: false,
                decimal_length: true,
                float_precision: true,
                max_sentinel: false,
                fractional_seconds: FractionalSeconds::Never,
                identity_marker: Some("AUTO_INCREMENT"),
                marker_order: MarkerOrder::IdentityFirst,
            },
            Dialect::MsSql => DialectProfile {
                display_width: false,
                decimal_length: true,
                float_precision: false,
                max_sentinel: true,
                fractional_seconds: FractionalSeconds::Never,
                identity_marker: Some("IDENTITY"),
                marker_order: MarkerOrder::IdentityFirst,
            },
            Dialect::MySql => DialectProfile {
                display_width: true,
                decimal_length: true,
                float_precision: false,
                max_sentinel: false,
                fractional_seconds: FractionalSeconds::Since(MYSQL_FRACTIONAL_SECONDS_VERSION),
                identity_marker: Some("AUTO_INCREMENT"),
                marker_order: MarkerOrder::IdentityFirst,
            },
            Dialect::Oracle => DialectProfile {
                display_width: true,
                decimal_length: false,
                float_precision: false,
                max_sentinel: false,
                fractional_seconds: FractionalSeconds::Never,
                identity_marker: None,
                marker_order: MarkerOrder::PrimaryKeyFirst,
            },
            Dialect::PostgreSql => DialectProfile {
                display_width: false,
                decimal_length: true,
                float_precision: false,
                max_sentinel: false,
                fractional_seconds: FractionalSeconds::Always,
                identity_marker: None,
                marker_order: MarkerOrder::PrimaryKeyFirst,
            },
            Dialect::Sqlite => DialectProfile {
                display_width: false,
                decimal_length: true,
                float_precision: false,
                max_sentinel: false,
                fractional_seconds: FractionalSeconds::Never,
                identity_marker: Some("AUTOINCREMENT"),
                marker_order: MarkerOrder::PrimaryKeyFirst,
            },
        }
    }

    /// Whether a column of the given length kind reports its length here
    pub fn keeps_length(&self, kind: LengthKind, engine_version: Option<&str>) -> bool {
        let profile = self.profile();
        match kind {
            LengthKind::None => false,
            LengthKind::Size => true,
            LengthKind::DisplayWidth => profile.display_width,
            LengthKind::LargeObject => profile.max_sentinel,
            LengthKind::FloatPrecision => profile.float_precision,
            LengthKind::Decimal => profile.decimal_length,
            LengthKind::FractionalSeconds => match profile.fractional_seconds {
                FractionalSeconds::Never => false,
                FractionalSeconds::Always => true,
                FractionalSeconds::Since(minimum) => version_at_least(engine_version, minimum),
            },
        }
    }

    /// Native type the dialect uses for an abstract column type
    pub fn native_type(&self, column_type: ColumnType, engine_version: Option<&str>) -> &'static str {
        use ColumnType::*;

        match self {
            Dialect::MySql => {
                let fractional = version_at_least(engine_version, MYSQL_FRACTIONAL_SECONDS_VERSION);
                match column_type {
                    PrimaryKey => "int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY",
                    UnsignedPrimaryKey => "int(10) UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY",
                    BigPrimaryKey => "bigint(20) NOT NULL AUTO_INCREMENT PRIMARY KEY",
                    UnsignedBigPrimaryKey => "bigint(20) UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY",
                    Char => "char(1)",
                    String => "varchar(255)",
                    Text => "text",
                    TinyInteger => "tinyint(3)",
                    SmallInteger => "smallint(6)",
                    Integer => "int(11)",
                    BigInteger => "bigint(20)",
                    Float => "float",
                    Double => "double",
                    Decimal => "decimal(10,0)",
                    DateTime if fractional => "datetime(0)",
                    DateTime => "datetime",
                    Timestamp if fractional => "timestamp(0)",
                    Timestamp => "timestamp",
                    Time if fractional => "time(0)",
                    Time => "time",
                    Date => "date",
                    Binary => "blob",
                    Boolean => "tinyint(1)",
                    Money => "decimal(19,4)",
                    Json => "json",
                }
            }
            Dialect::PostgreSql => match column_type {
                PrimaryKey | UnsignedPrimaryKey => "serial NOT NULL PRIMARY KEY",
                BigPrimaryKey | UnsignedBigPrimaryKey => "bigserial NOT NULL PRIMARY KEY",
                Char => "char(1)",
                String => "varchar(255)",
                Text => "text",
                TinyInteger | SmallInteger => "smallint",
                Integer => "integer",
                BigInteger => "bigint",
                Float | Double => "double precision",
                Decimal => "numeric(10,0)",
                DateTime | Timestamp => "timestamp(0)",
                Time => "time(0)",
                Date => "date",
                Binary => "bytea",
                Boolean => "boolean",
                Money => "numeric(19,4)",
                Json => "jsonb",
            },
            Dialect::Sqlite => match column_type {
                PrimaryKey | UnsignedPrimaryKey | BigPrimaryKey | UnsignedBigPrimaryKey => {
                    "integer PRIMARY KEY AUTOINCREMENT NOT NULL"
                }
                Char => "char(1)",
                String => "varchar(255)",
                Text => "text",
                TinyInteger => "tinyint",
                SmallInteger => "smallint",
                Integer => "integer",
                BigInteger => "bigint",
                Float => "float",
                Double => "double",
                Decimal => "decimal(10,0)",
                DateTime => "datetime",
                Timestamp => "timestamp",
                Time => "time",
                Date => "date",
                Binary => "blob",
                Boolean => "boolean",
                Money => "decimal(19,4)",
                Json => "text",
            },
            Dialect::MsSql => match column_type {
                PrimaryKey | UnsignedPrimaryKey => "int IDENTITY PRIMARY KEY",
                BigPrimaryKey | UnsignedBigPrimaryKey => "bigint IDENTITY PRIMARY KEY",
                Char => "nchar(1)",
                String => "nvarchar(255)",
                Text => "nvarchar(max)",
                TinyInteger => "tinyint",
                SmallInteger => "smallint",
                Integer => "int",
                BigInteger => "bigint",
                Float | Double => "float",
                Decimal => "decimal(18,0)",
                DateTime | Timestamp => "datetime",
                Time => "time",
                Date => "date",
                Binary => "varbinary(max)",
                Boolean => "bit",
                Money => "decimal(19,4)",
                Json => "nvarchar(max)",
            },
            Dialect::Oracle => match column_type {
                PrimaryKey => "NUMBER(10) NOT NULL PRIMARY KEY",
                UnsignedPrimaryKey => "NUMBER(10) UNSIGNED NOT NULL PRIMARY KEY",
                BigPrimaryKey => "NUMBER(20) NOT NULL PRIMARY KEY",
                UnsignedBigPrimaryKey => "NUMBER(20) UNSIGNED NOT NULL PRIMARY KEY",
                Char => "CHAR(1)",
                String => "VARCHAR2(255)",
                Text => "CLOB",
                TinyInteger => "NUMBER(3)",
                SmallInteger => "NUMBER(5)",
                Integer => "NUMBER(10)",
                BigInteger => "NUMBER(20)",
                Float | Double | Decimal => "NUMBER",
                DateTime | Timestamp | Time => "TIMESTAMP",
                Date => "DATE",
                Binary => "BLOB",
                Boolean => "NUMBER(1)",
                Money => "NUMBER(19,4)",
                Json => "CLOB",
            },
            Dialect::Cubrid => match column_type {
                PrimaryKey => "int NOT NULL AUTO_INCREMENT PRIMARY KEY",
                UnsignedPrimaryKey => "int UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY",
                BigPrimaryKey => "bigint NOT NULL AUTO_INCREMENT PRIMARY KEY",
                UnsignedBigPrimaryKey => "bigint UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY",
                Char => "char(1)",
                String => "varchar(255)",
                Text => "varchar",
                TinyInteger | SmallInteger => "smallint",
                Integer => "int",
                BigInteger => "bigint",
                Float => "float(7)",
                Double => "double(15)",
                Decimal => "decimal(10,0)",
                DateTime => "datetime",
                Timestamp => "timestamp",
                Time => "time",
                Date => "date",
                Binary => "blob",
                Boolean => "smallint",
                Money => "decimal(19,4)",
                Json => "varchar",
            },
        }
    }

    /// Length the dialect assigns to a column type when none is declared
    ///
    /// Parsed from the native type mapping; `None` when the type carries no
    /// length here or the dialect does not report lengths for it.
    pub fn default_length(&self, column_type: ColumnType, engine_version: Option<&str>) -> Option<String> {
        if !self.keeps_length(column_type.length_kind(), engine_version) {
            return None;
        }

        let native = self.native_type(column_type, engine_version);
        let captures = DEFAULT_LENGTH_PATTERN.captures(native)?;
        let raw = captures.get(1)?.as_str();

        if raw.eq_ignore_ascii_case("max") {
            return Some("max".to_string());
        }

        Some(raw.split(',').collect::<Vec<_>>().join(", "))
    }

    /// Append text encoding primary key and auto increment membership
    pub fn prepare_schema_append(&self, primary_key: bool, auto_increment: bool) -> Option<String> {
        let profile = self.profile();
        let identity = if auto_increment { profile.identity_marker } else { None };
        let key = if primary_key { Some(PRIMARY_KEY_MARKER) } else { None };

        let parts: Vec<&str> = match profile.marker_order {
            MarkerOrder::IdentityFirst => [identity, key],
            MarkerOrder::PrimaryKeyFirst => [key, identity],
        }
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cubrid" => Ok(Dialect::Cubrid),
            "mssql" | "sqlsrv" | "dblib" | "sqlserver" => Ok(Dialect::MsSql),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "oci" | "oracle" => Ok(Dialect::Oracle),
            "pgsql" | "postgres" | "postgresql" => Ok(Dialect::PostgreSql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(Error::ConfigError(format!("Unsupported dialect: {}", other))),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dialect> for String {
    fn from(dialect: Dialect) -> Self {
        dialect.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_driver_aliases() {
        assert_eq!("mariadb".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("Postgres".parse::<Dialect>().unwrap(), Dialect::PostgreSql);
        assert_eq!("sqlsrv".parse::<Dialect>().unwrap(), Dialect::MsSql);
        assert_eq!("oracle".parse::<Dialect>().unwrap(), Dialect::Oracle);
        assert!("db2".parse::<Dialect>().is_err());
    }

    #[test]
    fn default_lengths_come_from_native_types() {
        assert_eq!(Dialect::MySql.default_length(ColumnType::Integer, None).as_deref(), Some("11"));
        assert_eq!(Dialect::MySql.default_length(ColumnType::Decimal, None).as_deref(), Some("10, 0"));
        assert_eq!(Dialect::PostgreSql.default_length(ColumnType::Integer, None), None);
        assert_eq!(Dialect::PostgreSql.default_length(ColumnType::Timestamp, None).as_deref(), Some("0"));
        assert_eq!(Dialect::MsSql.default_length(ColumnType::Binary, None).as_deref(), Some("max"));
        assert_eq!(Dialect::Oracle.default_length(ColumnType::Money, None), None);
        assert_eq!(Dialect::Cubrid.default_length(ColumnType::Double, None).as_deref(), Some("15"));
    }

    #[test]
    fn mysql_fractional_seconds_depend_on_engine_version() {
        assert_eq!(Dialect::MySql.default_length(ColumnType::DateTime, Some("5.5.1")), None);
        assert_eq!(
            Dialect::MySql.default_length(ColumnType::DateTime, Some("8.0.21")).as_deref(),
            Some("0")
        );
    }

    #[test]
    fn schema_append_follows_dialect_spelling() {
        assert_eq!(
            Dialect::MySql.prepare_schema_append(true, true).as_deref(),
            Some("AUTO_INCREMENT PRIMARY KEY")
        );
        assert_eq!(
            Dialect::Sqlite.prepare_schema_append(true, true).as_deref(),
            Some("PRIMARY KEY AUTOINCREMENT")
        );
        assert_eq!(
            Dialect::MsSql.prepare_schema_append(true, true).as_deref(),
            Some("IDENTITY PRIMARY KEY")
        );
        assert_eq!(
            Dialect::PostgreSql.prepare_schema_append(true, true).as_deref(),
            Some("PRIMARY KEY")
        );
        assert_eq!(Dialect::Oracle.prepare_schema_append(false, true), None);
    }
}
