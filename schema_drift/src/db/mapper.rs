//! Mapping of live table metadata into structures
//!
//! Live structures keep single-column primary keys and unique indexes on the
//! column itself: the key as the dialect's append text, the index as the
//! column's unique flag.

use crate::db::introspector::{ColumnMetadata, ForeignKeyMetadata, TableMetadata};
use crate::error::{Error, Result};
use crate::schema::column::{Column, DefaultValue, LengthKind};
use crate::schema::dialect::Dialect;
use crate::schema::types::{Constraint, ForeignKey, Index, PrimaryKey, ReferenceAction, Structure};

/// Maps introspected metadata to structures
#[derive(Debug, Clone)]
pub struct TableMapper {
    dialect: Dialect,
    engine_version: Option<String>,
    prefix: Option<String>,
}

impl TableMapper {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            engine_version: None,
            prefix: None,
        }
    }

    pub fn engine_version(mut self, engine_version: Option<&str>) -> Self {
        self.engine_version = engine_version.map(str::to_string);
        self
    }

    pub fn prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    /// Build the live structure of a table
    pub fn map(&self, metadata: &TableMetadata) -> Result<Structure> {
        let mut structure = Structure::new(&metadata.name, self.dialect);
        structure.prefix = self.prefix.clone();

        let key_columns: Vec<String> = match &metadata.primary_key {
            Some(key) => key.columns.clone(),
            None => metadata
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone())
                .collect(),
        };
        let key_name = metadata.primary_key.as_ref().and_then(|key| key.name.clone());
        let composite = key_columns.len() > 1;

        for raw in &metadata.columns {
            let in_key = key_columns.contains(&raw.name);
            structure.add_column(self.map_column(raw, in_key && !composite)?);
        }

        match key_columns.as_slice() {
            [] => {}
            [single] => structure.set_primary_key(Some(Constraint::Folded {
                name: key_name.clone(),
                column: single.clone(),
            })),
            _ => structure.set_primary_key(Some(Constraint::Discrete(PrimaryKey::new(
                key_name.as_deref(),
                &key_columns,
            )))),
        }

        for index in &metadata.indexes {
            if index.primary || key_name.as_deref() == Some(index.name.as_str()) {
                continue;
            }

            if let ([single], true) = (index.columns.as_slice(), index.unique) {
                if let Some(column) = structure.column_mut(single) {
                    column.unique = true;
                    let column = single.clone();
                    structure.add_index(
                        &index.name,
                        Constraint::Folded {
                            name: Some(index.name.clone()),
                            column,
                        },
                    );
                    continue;
                }
            }

            let columns: Vec<&str> = index.columns.iter().map(String::as_str).collect();
            structure.add_index(
                &index.name,
                Constraint::Discrete(Index::new(&index.name, &columns, index.unique)),
            );
        }

        for foreign_key in &metadata.foreign_keys {
            structure.add_foreign_key(map_foreign_key(&metadata.name, foreign_key)?);
        }

        tracing::debug!(
            table = %metadata.name,
            columns = structure.columns().len(),
            "Mapped live structure"
        );

        Ok(structure)
    }

    fn map_column(&self, raw: &ColumnMetadata, sole_key_column: bool) -> Result<Column> {
        let engine_version = self.engine_version.as_deref();
        let mut column = Column::new(&raw.name, raw.column_type, self.dialect).engine_version(engine_version);

        if let Some(length) = raw_length(raw) {
            column
                .set_length(&length, self.dialect, engine_version)
                .map_err(|e| Error::IntrospectionError(format!("Column '{}': {}", raw.name, e)))?;
        }

        column.nullable = raw.nullable;
        column.unique = raw.unique;
        column.unsigned = raw.unsigned || raw.column_type.implies_unsigned();
        column.primary_key = sole_key_column;
        column.auto_increment = raw.auto_increment;
        column.comment = raw.comment.clone();
        column.default = match &raw.default_expression {
            Some(expression) => Some(DefaultValue::Expression(expression.clone())),
            None => raw.default.clone().and_then(DefaultValue::from_json),
        };

        let markers = self.dialect.prepare_schema_append(sole_key_column, raw.auto_increment);
        let append: Vec<&str> = markers
            .as_deref()
            .into_iter()
            .chain(raw.extra.as_deref().map(str::trim))
            .filter(|part| !part.is_empty())
            .collect();
        column.append = if append.is_empty() { None } else { Some(append.join(" ")) };

        Ok(column)
    }
}

/// Length text for the column's length kind, built from the reported
/// size, precision and scale
fn raw_length(raw: &ColumnMetadata) -> Option<String> {
    match raw.column_type.length_kind() {
        LengthKind::None => None,
        LengthKind::DisplayWidth | LengthKind::Size | LengthKind::LargeObject => raw.size.map(|s| s.to_string()),
        LengthKind::FloatPrecision | LengthKind::FractionalSeconds => raw.precision.map(|p| p.to_string()),
        LengthKind::Decimal => raw.precision.map(|precision| match raw.scale {
            Some(scale) => format!("{},{}", precision, scale),
            None => precision.to_string(),
        }),
    }
}

fn map_foreign_key(table: &str, raw: &ForeignKeyMetadata) -> Result<ForeignKey> {
    let action = |value: &Option<String>| -> Result<Option<ReferenceAction>> {
        match value.as_deref() {
            None => Ok(None),
            Some(value) => ReferenceAction::parse(value).map(Some).ok_or_else(|| {
                Error::IntrospectionError(format!(
                    "Unknown referential action '{}' on foreign key '{}' of table '{}'",
                    value, raw.name, table
                ))
            }),
        }
    };

    Ok(ForeignKey {
        name: raw.name.clone(),
        columns: raw.columns.clone(),
        referred_table: raw.referred_table.clone(),
        referred_columns: raw.referred_columns.clone(),
        on_delete: action(&raw.on_delete)?,
        on_update: action(&raw.on_update)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::introspector::{IndexMetadata, PrimaryKeyMetadata};
    use crate::schema::column::ColumnType;

    fn table() -> TableMetadata {
        let mut id = ColumnMetadata::new("id", ColumnType::Integer);
        id.size = Some(11);
        id.nullable = false;
        id.primary_key = true;
        id.auto_increment = true;

        let mut email = ColumnMetadata::new("email", ColumnType::String);
        email.size = Some(255);

        let mut price = ColumnMetadata::new("price", ColumnType::Decimal);
        price.precision = Some(10);
        price.scale = Some(2);

        TableMetadata {
            name: "user".to_string(),
            columns: vec![id, email, price],
            primary_key: None,
            indexes: vec![
                IndexMetadata {
                    name: "PRIMARY".to_string(),
                    columns: vec!["id".to_string()],
                    unique: true,
                    primary: true,
                },
                IndexMetadata {
                    name: "idx_email".to_string(),
                    columns: vec!["email".to_string()],
                    unique: true,
                    primary: false,
                },
                IndexMetadata {
                    name: "idx_email_price".to_string(),
                    columns: vec!["email".to_string(), "price".to_string()],
                    unique: false,
                    primary: false,
                },
            ],
            foreign_keys: vec![],
        }
    }

    #[test]
    fn single_column_key_and_unique_index_live_on_columns() {
        let structure = TableMapper::new(Dialect::MySql).map(&table()).unwrap();

        let id = structure.column("id").unwrap();
        assert!(id.primary_key);
        assert_eq!(id.append.as_deref(), Some("AUTO_INCREMENT PRIMARY KEY"));
        assert_eq!(id.length().as_deref(), Some("11"));
        assert!(structure.primary_key().is_none());
        assert_eq!(structure.primary_key_columns(), vec!["id".to_string()]);

        assert!(structure.column("email").unwrap().unique);
        assert!(structure.index("idx_email").is_none());
        assert!(structure.index("PRIMARY").is_none());
        assert_eq!(structure.indexes().count(), 1);
        assert_eq!(structure.column("price").unwrap().length().as_deref(), Some("10, 2"));
    }

    #[test]
    fn composite_key_stays_discrete() {
        let mut metadata = table();
        metadata.primary_key = Some(PrimaryKeyMetadata {
            name: Some("pk_user".to_string()),
            columns: vec!["id".to_string(), "email".to_string()],
        });

        let structure = TableMapper::new(Dialect::PostgreSql).map(&metadata).unwrap();
        assert_eq!(structure.primary_key().unwrap().name.as_deref(), Some("pk_user"));
        let id = structure.column("id").unwrap();
        assert!(!id.primary_key);
        assert_eq!(id.append, None);
    }

    #[test]
    fn unknown_referential_action_is_rejected() {
        let mut metadata = table();
        metadata.foreign_keys.push(ForeignKeyMetadata {
            name: "fk_team".to_string(),
            columns: vec!["team_id".to_string()],
            referred_table: "team".to_string(),
            referred_columns: vec!["id".to_string()],
            on_delete: Some("explode".to_string()),
            on_update: None,
        });

        let err = TableMapper::new(Dialect::MySql).map(&metadata).unwrap_err();
        assert!(matches!(err, Error::IntrospectionError(_)));
    }
}
