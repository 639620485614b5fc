//! Column model
//!
//! Columns are value objects carrying every property a migration can declare.
//! Length handling is driven by the column type's [`LengthKind`] and the
//! owning dialect's capability profile.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::dialect::Dialect;

static PRIMARY_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").expect("valid primary key pattern"));

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Abstract column types, named after the migration builder's type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "pk")]
    PrimaryKey,
    #[serde(rename = "upk")]
    UnsignedPrimaryKey,
    #[serde(rename = "bigpk")]
    BigPrimaryKey,
    #[serde(rename = "ubigpk")]
    UnsignedBigPrimaryKey,
    #[serde(rename = "char")]
    Char,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "tinyint")]
    TinyInteger,
    #[serde(rename = "smallint")]
    SmallInteger,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "bigint")]
    BigInteger,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "decimal")]
    Decimal,
    #[serde(rename = "datetime")]
    DateTime,
    #[serde(rename = "timestamp")]
    Timestamp,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "binary")]
    Binary,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "money")]
    Money,
    #[serde(rename = "json")]
    Json,
}

/// How a column type expresses its length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthKind {
    None,
    /// Integer display width
    DisplayWidth,
    /// Character size
    Size,
    /// Large object size, possibly the `max` sentinel
    LargeObject,
    FloatPrecision,
    /// Precision with optional scale
    Decimal,
    FractionalSeconds,
}

impl ColumnType {
    /// Tag used by the migration builder for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::PrimaryKey => "pk",
            ColumnType::UnsignedPrimaryKey => "upk",
            ColumnType::BigPrimaryKey => "bigpk",
            ColumnType::UnsignedBigPrimaryKey => "ubigpk",
            ColumnType::Char => "char",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::TinyInteger => "tinyint",
            ColumnType::SmallInteger => "smallint",
            ColumnType::Integer => "integer",
            ColumnType::BigInteger => "bigint",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::DateTime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Time => "time",
            ColumnType::Date => "date",
            ColumnType::Binary => "binary",
            ColumnType::Boolean => "boolean",
            ColumnType::Money => "money",
            ColumnType::Json => "json",
        }
    }

    pub fn length_kind(&self) -> LengthKind {
        match self {
            ColumnType::PrimaryKey
            | ColumnType::UnsignedPrimaryKey
            | ColumnType::BigPrimaryKey
            | ColumnType::UnsignedBigPrimaryKey
            | ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger => LengthKind::DisplayWidth,
            ColumnType::Char | ColumnType::String => LengthKind::Size,
            ColumnType::Binary => LengthKind::LargeObject,
            ColumnType::Float | ColumnType::Double => LengthKind::FloatPrecision,
            ColumnType::Decimal | ColumnType::Money => LengthKind::Decimal,
            ColumnType::DateTime | ColumnType::Timestamp | ColumnType::Time => LengthKind::FractionalSeconds,
            ColumnType::Text | ColumnType::Date | ColumnType::Boolean | ColumnType::Json => LengthKind::None,
        }
    }

    /// Definition template with a `{length}` placeholder
    pub fn definition(&self) -> &'static str {
        match self {
            ColumnType::PrimaryKey => "primaryKey({length})",
            ColumnType::UnsignedPrimaryKey => "primaryKey({length})->unsigned()",
            ColumnType::BigPrimaryKey => "bigPrimaryKey({length})",
            ColumnType::UnsignedBigPrimaryKey => "bigPrimaryKey({length})->unsigned()",
            ColumnType::Char => "char({length})",
            ColumnType::String => "string({length})",
            ColumnType::Text => "text()",
            ColumnType::TinyInteger => "tinyInteger({length})",
            ColumnType::SmallInteger => "smallInteger({length})",
            ColumnType::Integer => "integer({length})",
            ColumnType::BigInteger => "bigInteger({length})",
            ColumnType::Float => "float({length})",
            ColumnType::Double => "double({length})",
            ColumnType::Decimal => "decimal({length})",
            ColumnType::DateTime => "dateTime({length})",
            ColumnType::Timestamp => "timestamp({length})",
            ColumnType::Time => "time({length})",
            ColumnType::Date => "date()",
            ColumnType::Binary => "binary({length})",
            ColumnType::Boolean => "boolean()",
            ColumnType::Money => "money({length})",
            ColumnType::Json => "json()",
        }
    }

    pub fn is_primary_key_variant(&self) -> bool {
        matches!(
            self,
            ColumnType::PrimaryKey
                | ColumnType::UnsignedPrimaryKey
                | ColumnType::BigPrimaryKey
                | ColumnType::UnsignedBigPrimaryKey
        )
    }

    /// Whether the type itself implies an unsigned column
    pub fn implies_unsigned(&self) -> bool {
        matches!(self, ColumnType::UnsignedPrimaryKey | ColumnType::UnsignedBigPrimaryKey)
    }

    /// Plain type underlying a primary key variant; other types map to themselves
    pub fn canonical(&self) -> ColumnType {
        match self {
            ColumnType::PrimaryKey | ColumnType::UnsignedPrimaryKey => ColumnType::Integer,
            ColumnType::BigPrimaryKey | ColumnType::UnsignedBigPrimaryKey => ColumnType::BigInteger,
            other => *other,
        }
    }

    /// Primary key variant a column of this type switches to when it is the
    /// sole primary key column
    pub fn primary_key_variant(&self, unsigned: bool) -> Option<ColumnType> {
        match (self.canonical(), unsigned) {
            (ColumnType::Integer, false) => Some(ColumnType::PrimaryKey),
            (ColumnType::Integer, true) => Some(ColumnType::UnsignedPrimaryKey),
            (ColumnType::BigInteger, false) => Some(ColumnType::BigPrimaryKey),
            (ColumnType::BigInteger, true) => Some(ColumnType::UnsignedBigPrimaryKey),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
            .map_err(|_| Error::SerializationError(format!("Unknown column type: {}", s)))
    }
}

/// Declared size of a character or large object column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Size {
    Fixed(u32),
    Max,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Fixed(size) => write!(f, "{}", size),
            Size::Max => f.write_str("max"),
        }
    }
}

impl FromStr for Size {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") || s == "-1" {
            return Ok(Size::Max);
        }
        s.parse::<u32>()
            .map(Size::Fixed)
            .map_err(|_| Error::SerializationError(format!("Invalid column size: {}", s)))
    }
}

impl TryFrom<String> for Size {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Size> for String {
    fn from(size: Size) -> Self {
        size.to_string()
    }
}

/// Default value of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    /// Plain literal (string, number, boolean)
    Scalar(serde_json::Value),
    /// Raw SQL expression such as `CURRENT_TIMESTAMP`
    Expression(String),
    /// Array or object default, compared structurally
    Structured(serde_json::Value),
}

impl DefaultValue {
    /// Classify a JSON value; arrays and objects become structured defaults
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            v @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => Some(DefaultValue::Structured(v)),
            v => Some(DefaultValue::Scalar(v)),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Scalar(serde_json::Value::String(s)) => f.write_str(s),
            DefaultValue::Scalar(v) | DefaultValue::Structured(v) => write!(f, "{}", v),
            DefaultValue::Expression(expr) => f.write_str(expr),
        }
    }
}

/// Primary key and auto increment membership encoded by append text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendMembership {
    pub primary_key: bool,
    pub auto_increment: bool,
}

/// Represents a table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub size: Option<Size>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub unique: bool,
    pub unsigned: bool,
    pub default: Option<DefaultValue>,
    pub comment: Option<String>,
    pub append: Option<String>,
    pub after: Option<String>,
    pub first: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub dialect: Dialect,
    pub engine_version: Option<String>,
}

impl Column {
    /// Create a new nullable column; primary key variants come out not null,
    /// auto incremented and flagged as primary key
    pub fn new(name: &str, column_type: ColumnType, dialect: Dialect) -> Self {
        let variant = column_type.is_primary_key_variant();
        Self {
            name: name.to_string(),
            column_type,
            size: None,
            precision: None,
            scale: None,
            nullable: !variant,
            unique: false,
            unsigned: column_type.implies_unsigned(),
            default: None,
            comment: None,
            append: None,
            after: None,
            first: false,
            primary_key: variant,
            auto_increment: variant,
            dialect,
            engine_version: None,
        }
    }

    /// Set the engine version used for version-dependent length rules
    pub fn engine_version(mut self, engine_version: Option<&str>) -> Self {
        self.engine_version = engine_version.map(str::to_string);
        self
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    /// Set a default value for the column
    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn append(mut self, append: &str) -> Self {
        self.append = Some(append.to_string());
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    /// Set the length using the column's own dialect
    pub fn with_length(mut self, length: &str) -> Result<Self> {
        let dialect = self.dialect;
        let engine_version = self.engine_version.clone();
        self.set_length(length, dialect, engine_version.as_deref())?;
        Ok(self)
    }

    /// Length as reported by the column's own dialect
    pub fn length(&self) -> Option<String> {
        self.length_for(self.dialect, self.engine_version.as_deref())
    }

    /// Length as the given dialect reports it, `None` when the dialect drops it
    pub fn length_for(&self, dialect: Dialect, engine_version: Option<&str>) -> Option<String> {
        let kind = self.column_type.length_kind();
        if !dialect.keeps_length(kind, engine_version) {
            return None;
        }

        match kind {
            LengthKind::None => None,
            LengthKind::DisplayWidth | LengthKind::Size | LengthKind::LargeObject => {
                self.size.map(|size| size.to_string())
            }
            LengthKind::FloatPrecision | LengthKind::FractionalSeconds => {
                self.precision.map(|precision| precision.to_string())
            }
            LengthKind::Decimal => self.precision.map(|precision| match self.scale {
                Some(scale) => format!("{}, {}", precision, scale),
                None => precision.to_string(),
            }),
        }
    }

    /// Store a length the way the given dialect keeps it; ignored when the
    /// dialect does not report lengths for this type
    pub fn set_length(&mut self, value: &str, dialect: Dialect, engine_version: Option<&str>) -> Result<()> {
        let kind = self.column_type.length_kind();
        if !dialect.keeps_length(kind, engine_version) {
            return Ok(());
        }

        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }

        match kind {
            LengthKind::None => {}
            LengthKind::DisplayWidth | LengthKind::Size => {
                self.size = Some(Size::Fixed(parse_number(value)?));
            }
            LengthKind::LargeObject => {
                self.size = Some(value.parse()?);
            }
            LengthKind::FloatPrecision | LengthKind::FractionalSeconds => {
                self.precision = Some(parse_number(value)?);
            }
            LengthKind::Decimal => {
                let mut parts = value.split(',').map(str::trim);
                self.precision = parts.next().map(parse_number).transpose()?;
                self.scale = parts.next().map(parse_number).transpose()?;
                if parts.next().is_some() {
                    return Err(Error::SerializationError(format!("Invalid decimal length: {}", value)));
                }
            }
        }

        Ok(())
    }

    /// Length for portable renderings: omitted when equal to the dialect default
    pub fn general_length(&self) -> Option<String> {
        let length = self.length()?;
        let default = self
            .dialect
            .default_length(self.default_length_type(), self.engine_version.as_deref());

        if default.as_deref() == Some(length.as_str()) {
            None
        } else {
            Some(length)
        }
    }

    /// Type whose native mapping gives the default length. Key columns and
    /// unsigned integers use their primary key variant (`int(10) UNSIGNED`).
    fn default_length_type(&self) -> ColumnType {
        if self.column_type.is_primary_key_variant() {
            return self.column_type;
        }

        let in_key = self.primary_key || self.is_primary_key_info_appended(self.dialect);
        if !in_key && !self.unsigned {
            return self.column_type;
        }

        self.column_type
            .primary_key_variant(self.unsigned)
            .unwrap_or(self.column_type)
    }

    /// Membership flags recognised in the append text for the given dialect
    pub fn append_membership(&self, dialect: Dialect) -> AppendMembership {
        let append = match self.append.as_deref() {
            Some(append) if !append.trim().is_empty() => append,
            _ => return AppendMembership::default(),
        };

        AppendMembership {
            primary_key: PRIMARY_KEY_PATTERN.is_match(append),
            auto_increment: dialect
                .profile()
                .identity_marker
                .and_then(identity_pattern)
                .map_or(false, |pattern| pattern.is_match(append)),
        }
    }

    /// Check whether the append text declares the column as primary key
    pub fn is_primary_key_info_appended(&self, dialect: Dialect) -> bool {
        self.append_membership(dialect).primary_key
    }

    /// Append text with primary key and identity markers removed
    pub fn append_residual(&self, dialect: Dialect) -> Option<String> {
        let append = self.append.as_deref()?;
        let mut residual = PRIMARY_KEY_PATTERN.replace_all(append, " ").into_owned();

        if let Some(pattern) = dialect.profile().identity_marker.and_then(identity_pattern) {
            residual = pattern.replace_all(&residual, " ").into_owned();
        }

        let residual = WHITESPACE_PATTERN.replace_all(residual.trim(), " ").into_owned();
        if residual.is_empty() {
            None
        } else {
            Some(residual)
        }
    }

    /// Remove the primary key marker from the append text, keeping the rest
    pub fn remove_primary_key_marker(&mut self) {
        let Some(append) = self.append.as_deref() else {
            return;
        };

        let stripped = PRIMARY_KEY_PATTERN.replace_all(append, " ");
        let stripped = WHITESPACE_PATTERN.replace_all(stripped.trim(), " ").into_owned();
        self.append = if stripped.is_empty() { None } else { Some(stripped) };
    }
}

/// Case-insensitive whole-word pattern for a dialect's identity marker
fn identity_pattern(marker: &str) -> Option<&'static Regex> {
    static AUTO_INCREMENT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\bAUTO_INCREMENT\b").expect("valid identity pattern"));
    static AUTOINCREMENT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\bAUTOINCREMENT\b").expect("valid identity pattern"));
    static IDENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bIDENTITY\b").expect("valid identity pattern"));

    match marker {
        "AUTO_INCREMENT" => Some(&*AUTO_INCREMENT),
        "AUTOINCREMENT" => Some(&*AUTOINCREMENT),
        "IDENTITY" => Some(&*IDENTITY),
        _ => None,
    }
}

fn parse_number(value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::SerializationError(format!("Invalid column length: {}", value)))
}
