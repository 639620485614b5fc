//! Structure change records
//!
//! A [`StructureChange`] is one operation recorded in a table's migration
//! history: a method tag plus an untyped JSON payload. [`StructureChange::value`]
//! decodes the payload into a typed [`ChangeValue`] according to the tag.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::column::{Column, ColumnType, DefaultValue};
use crate::schema::dialect::Dialect;
use crate::schema::types::{ForeignKey, Index, PrimaryKey, ReferenceAction};

/// Operations a migration history can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChangeMethod {
    CreateTable,
    AddColumn,
    AlterColumn,
    DropColumn,
    RenameColumn,
    AddPrimaryKey,
    DropPrimaryKey,
    AddForeignKey,
    DropForeignKey,
    CreateIndex,
    DropIndex,
    AddCommentOnColumn,
    DropCommentFromColumn,
    RenameTable,
    DropTable,
}

impl ChangeMethod {
    /// Name of the migration method that recorded the change
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeMethod::CreateTable => "createTable",
            ChangeMethod::AddColumn => "addColumn",
            ChangeMethod::AlterColumn => "alterColumn",
            ChangeMethod::DropColumn => "dropColumn",
            ChangeMethod::RenameColumn => "renameColumn",
            ChangeMethod::AddPrimaryKey => "addPrimaryKey",
            ChangeMethod::DropPrimaryKey => "dropPrimaryKey",
            ChangeMethod::AddForeignKey => "addForeignKey",
            ChangeMethod::DropForeignKey => "dropForeignKey",
            ChangeMethod::CreateIndex => "createIndex",
            ChangeMethod::DropIndex => "dropIndex",
            ChangeMethod::AddCommentOnColumn => "addCommentOnColumn",
            ChangeMethod::DropCommentFromColumn => "dropCommentFromColumn",
            ChangeMethod::RenameTable => "renameTable",
            ChangeMethod::DropTable => "dropTable",
        }
    }
}

impl fmt::Display for ChangeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "createTable" => Ok(ChangeMethod::CreateTable),
            "addColumn" => Ok(ChangeMethod::AddColumn),
            "alterColumn" => Ok(ChangeMethod::AlterColumn),
            "dropColumn" => Ok(ChangeMethod::DropColumn),
            "renameColumn" => Ok(ChangeMethod::RenameColumn),
            "addPrimaryKey" => Ok(ChangeMethod::AddPrimaryKey),
            "dropPrimaryKey" => Ok(ChangeMethod::DropPrimaryKey),
            "addForeignKey" => Ok(ChangeMethod::AddForeignKey),
            "dropForeignKey" => Ok(ChangeMethod::DropForeignKey),
            "createIndex" => Ok(ChangeMethod::CreateIndex),
            "dropIndex" => Ok(ChangeMethod::DropIndex),
            "addCommentOnColumn" => Ok(ChangeMethod::AddCommentOnColumn),
            "dropCommentFromColumn" => Ok(ChangeMethod::DropCommentFromColumn),
            "renameTable" => Ok(ChangeMethod::RenameTable),
            "dropTable" => Ok(ChangeMethod::DropTable),
            other => Err(Error::UnknownMethod(other.to_string())),
        }
    }
}

impl TryFrom<String> for ChangeMethod {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ChangeMethod> for String {
    fn from(method: ChangeMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Raw history record as supplied by a history store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChange {
    pub table: String,
    pub method: String,
    #[serde(default)]
    pub data: Value,
}

/// One recorded operation on a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureChange {
    pub table: String,
    pub method: ChangeMethod,
    pub data: Value,
}

/// Typed payload of a structure change
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeValue {
    CreateTable(Vec<Column>),
    AddColumn(Column),
    AlterColumn(Column),
    DropColumn(String),
    RenameColumn { old: String, new: String },
    AddPrimaryKey(PrimaryKey),
    DropPrimaryKey(String),
    AddForeignKey(ForeignKey),
    DropForeignKey(String),
    CreateIndex(Index),
    DropIndex(String),
    AddCommentOnColumn { column: String, comment: String },
    DropCommentFromColumn(String),
    RenameTable(String),
    DropTable,
}

impl StructureChange {
    pub fn new(table: &str, method: ChangeMethod, data: Value) -> Self {
        Self {
            table: table.to_string(),
            method,
            data,
        }
    }

    /// Convert a raw record, rejecting unknown method tags
    pub fn from_raw(raw: RawChange) -> Result<Self> {
        Ok(Self {
            method: raw.method.parse()?,
            table: raw.table,
            data: raw.data,
        })
    }

    /// Decode the payload for the given dialect
    ///
    /// Fails with [`Error::DecodeError`] carrying the offending payload when
    /// it does not have the shape the method expects.
    pub fn value(&self, dialect: Dialect, engine_version: Option<&str>) -> Result<ChangeValue> {
        let value = match self.method {
            ChangeMethod::CreateTable => {
                let payload: CreateTablePayload = self.decode()?;
                let columns = payload
                    .columns
                    .into_iter()
                    .map(|(name, column)| column.into_column(Some(name.as_str()), dialect, engine_version))
                    .collect::<std::result::Result<Vec<_>, String>>()
                    .map_err(|reason| self.error(reason))?;
                ChangeValue::CreateTable(columns)
            }
            ChangeMethod::AddColumn => ChangeValue::AddColumn(self.decode_column(dialect, engine_version)?),
            ChangeMethod::AlterColumn => ChangeValue::AlterColumn(self.decode_column(dialect, engine_version)?),
            ChangeMethod::DropColumn => ChangeValue::DropColumn(self.decode_name()?),
            ChangeMethod::RenameColumn => {
                let payload: RenamePayload = self.decode()?;
                ChangeValue::RenameColumn {
                    old: payload.old,
                    new: payload.new,
                }
            }
            ChangeMethod::AddPrimaryKey => {
                let payload: PrimaryKeyPayload = self.decode()?;
                if payload.columns.is_empty() {
                    return Err(self.error("primary key without columns"));
                }
                ChangeValue::AddPrimaryKey(PrimaryKey::new(payload.name.as_deref(), &payload.columns))
            }
            ChangeMethod::DropPrimaryKey => ChangeValue::DropPrimaryKey(self.decode_name()?),
            ChangeMethod::AddForeignKey => {
                let payload: ForeignKeyPayload = self.decode()?;
                ChangeValue::AddForeignKey(ForeignKey {
                    on_delete: self.decode_action(payload.on_delete.as_deref())?,
                    on_update: self.decode_action(payload.on_update.as_deref())?,
                    name: payload.name,
                    columns: payload.columns,
                    referred_table: payload.referred_table,
                    referred_columns: payload.referred_columns,
                })
            }
            ChangeMethod::DropForeignKey => ChangeValue::DropForeignKey(self.decode_name()?),
            ChangeMethod::CreateIndex => {
                let payload: IndexPayload = self.decode()?;
                if payload.columns.is_empty() {
                    return Err(self.error("index without columns"));
                }
                ChangeValue::CreateIndex(Index {
                    name: payload.name,
                    columns: payload.columns,
                    unique: payload.unique,
                })
            }
            ChangeMethod::DropIndex => ChangeValue::DropIndex(self.decode_name()?),
            ChangeMethod::AddCommentOnColumn => {
                let payload: CommentPayload = self.decode()?;
                ChangeValue::AddCommentOnColumn {
                    column: payload.column,
                    comment: payload.comment,
                }
            }
            ChangeMethod::DropCommentFromColumn => ChangeValue::DropCommentFromColumn(self.decode_name()?),
            ChangeMethod::RenameTable => ChangeValue::RenameTable(self.decode_name()?),
            ChangeMethod::DropTable => ChangeValue::DropTable,
        };

        Ok(value)
    }

    fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| self.error(e))
    }

    fn decode_name(&self) -> Result<String> {
        match &self.data {
            Value::String(name) if !name.is_empty() => Ok(name.clone()),
            _ => Err(self.error("expected a non-empty name")),
        }
    }

    fn decode_column(&self, dialect: Dialect, engine_version: Option<&str>) -> Result<Column> {
        let payload: ColumnPayload = self.decode()?;
        payload
            .into_column(None, dialect, engine_version)
            .map_err(|reason| self.error(reason))
    }

    fn decode_action(&self, action: Option<&str>) -> Result<Option<ReferenceAction>> {
        match action {
            None => Ok(None),
            Some(action) => ReferenceAction::parse(action)
                .map(Some)
                .ok_or_else(|| self.error(format!("unknown referential action '{}'", action))),
        }
    }

    fn error(&self, reason: impl ToString) -> Error {
        Error::decode(self.method.as_str(), &self.data, reason)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateTablePayload {
    columns: IndexMap<String, ColumnPayload>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RenamePayload {
    old: String,
    new: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PrimaryKeyPayload {
    #[serde(default)]
    name: Option<String>,
    columns: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ForeignKeyPayload {
    name: String,
    columns: Vec<String>,
    referred_table: String,
    referred_columns: Vec<String>,
    #[serde(default)]
    on_delete: Option<String>,
    #[serde(default)]
    on_update: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexPayload {
    name: String,
    columns: Vec<String>,
    #[serde(default)]
    unique: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CommentPayload {
    column: String,
    comment: String,
}

/// Length as recorded: `"10"`, `"10, 2"`, `"max"` or a bare number
#[derive(Deserialize)]
#[serde(untagged)]
enum LengthPayload {
    Number(u64),
    Text(String),
}

impl LengthPayload {
    fn into_string(self) -> String {
        match self {
            LengthPayload::Number(number) => number.to_string(),
            LengthPayload::Text(text) => text,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    column_type: ColumnType,
    #[serde(default)]
    length: Option<LengthPayload>,
    #[serde(default)]
    not_null: Option<bool>,
    #[serde(default)]
    nullable: Option<bool>,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    unsigned: bool,
    #[serde(default)]
    primary_key: Option<bool>,
    #[serde(default)]
    auto_increment: Option<bool>,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    default_expression: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    append: Option<String>,
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    first: bool,
}

impl ColumnPayload {
    /// Build the column; `key` is the name under which a create-table payload
    /// lists the column
    fn into_column(
        self,
        key: Option<&str>,
        dialect: Dialect,
        engine_version: Option<&str>,
    ) -> std::result::Result<Column, String> {
        let name = match (key, self.name) {
            (Some(key), Some(name)) if key != name => {
                return Err(format!("column listed as '{}' is named '{}'", key, name));
            }
            (Some(key), _) => key.to_string(),
            (None, Some(name)) if !name.is_empty() => name,
            (None, _) => return Err("column without name".to_string()),
        };

        let mut column = Column::new(&name, self.column_type, dialect).engine_version(engine_version);

        if let Some(length) = self.length {
            column
                .set_length(&length.into_string(), dialect, engine_version)
                .map_err(|e| e.to_string())?;
        }

        match (self.not_null, self.nullable) {
            (Some(not_null), _) => column.nullable = !not_null,
            (None, Some(nullable)) => column.nullable = nullable,
            (None, None) => {}
        }

        column.unique = self.unique;
        column.unsigned = self.unsigned || self.column_type.implies_unsigned();

        if let Some(primary_key) = self.primary_key {
            column.primary_key = primary_key;
        }
        if let Some(auto_increment) = self.auto_increment {
            column.auto_increment = auto_increment;
        }

        column.default = match (self.default.and_then(DefaultValue::from_json), self.default_expression) {
            (Some(_), Some(_)) => return Err("both default and default_expression given".to_string()),
            (Some(default), None) => Some(default),
            (None, Some(expression)) => Some(DefaultValue::Expression(expression)),
            (None, None) => None,
        };

        column.comment = self.comment;
        column.append = self.append.filter(|a| !a.trim().is_empty());
        column.after = self.after;
        column.first = self.first;

        Ok(column)
    }
}
