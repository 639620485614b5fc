//! Structure builder
//!
//! Replays a table's recorded changes, oldest first, into the structure the
//! history declares. Primary keys and unique indexes covering a single column
//! are folded into that column so the result has the same shape as a
//! structure mapped from the live database.

use crate::error::Result;
use crate::history::change::{ChangeValue, StructureChange};
use crate::schema::column::Column;
use crate::schema::dialect::Dialect;
use crate::schema::types::{Constraint, Index, PrimaryKey, Structure};

/// Builds structures from change logs
#[derive(Debug, Clone)]
pub struct StructureBuilder {
    dialect: Dialect,
    engine_version: Option<String>,
    prefix: Option<String>,
}

impl StructureBuilder {
    /// Create a new builder for the given dialect
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

    /// Table prefix recorded on built structures
    pub fn prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    /// Replay the changes into a structure named `table`
    ///
    /// Every payload is decoded before replay starts; a single malformed
    /// change fails the whole build.
    pub fn build(&self, table: &str, changes: &[StructureChange]) -> Result<Structure> {
        let values = changes
            .iter()
            .map(|change| change.value(self.dialect, self.engine_version.as_deref()))
            .collect::<Result<Vec<_>>>()?;

        let mut structure = Structure::new(table, self.dialect);
        structure.prefix = self.prefix.clone();

        for (change, value) in changes.iter().zip(values) {
            tracing::debug!(table, method = %change.method, "Replaying structure change");
            structure = apply(structure, value);
        }

        tracing::debug!(
            table,
            changes = changes.len(),
            columns = structure.columns().len(),
            "Built declared structure"
        );

        Ok(structure)
    }
}

/// Apply one change to a structure
pub fn apply(mut structure: Structure, value: ChangeValue) -> Structure {
    match value {
        ChangeValue::CreateTable(columns) => create_table(structure, columns),
        ChangeValue::AddColumn(column) => add_column(structure, column),
        ChangeValue::AlterColumn(column) => alter_column(structure, column),
        ChangeValue::DropColumn(name) => {
            if structure.remove_column(&name).is_none() {
                tracing::warn!(table = %structure.name, column = %name, "Dropping unknown column");
            }
            structure
        }
        ChangeValue::RenameColumn { old, new } => {
            if structure.column(&old).is_none() {
                tracing::warn!(table = %structure.name, column = %old, "Renaming unknown column");
            } else {
                structure.rename_column(&old, &new);
            }
            structure
        }
        ChangeValue::AddPrimaryKey(primary_key) => fold_primary_key(unfold_primary_key(structure), primary_key),
        ChangeValue::DropPrimaryKey(_) => unfold_primary_key(structure),
        ChangeValue::AddForeignKey(foreign_key) => {
            structure.add_foreign_key(foreign_key);
            structure
        }
        ChangeValue::DropForeignKey(name) => {
            if structure.remove_foreign_key(&name).is_none() {
                tracing::warn!(table = %structure.name, foreign_key = %name, "Dropping unknown foreign key");
            }
            structure
        }
        ChangeValue::CreateIndex(index) => fold_unique_index(structure, index),
        ChangeValue::DropIndex(name) => unfold_unique_index(structure, &name),
        ChangeValue::AddCommentOnColumn { column, comment } => set_comment(structure, &column, Some(comment)),
        ChangeValue::DropCommentFromColumn(column) => set_comment(structure, &column, None),
        ChangeValue::RenameTable(name) => {
            structure.name = name;
            structure
        }
        ChangeValue::DropTable => {
            structure.clear();
            structure
        }
    }
}

fn create_table(mut structure: Structure, columns: Vec<Column>) -> Structure {
    structure.clear();

    let key_columns: Vec<String> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();

    structure.set_columns(columns);
    if !key_columns.is_empty() {
        structure.set_primary_key(Some(Constraint::Discrete(PrimaryKey::new(None, &key_columns))));
    }

    structure
}

fn add_column(mut structure: Structure, column: Column) -> Structure {
    let name = column.name.clone();
    let joins_key = column.primary_key;
    structure.add_column(column);

    if !joins_key {
        return structure;
    }

    let mut key = match structure.primary_key_constraint().cloned() {
        Some(Constraint::Discrete(key)) => key,
        Some(Constraint::Folded { name, column }) => {
            structure = unfold_primary_key(structure);
            PrimaryKey::new(name.as_deref(), &[column])
        }
        None => PrimaryKey::default(),
    };
    key.add_column(&name);
    structure.set_primary_key(Some(Constraint::Discrete(key)));

    structure
}

/// Replace a column wholesale; a column flagged as primary key joins the key
/// and a folded key keeps its marker on the replaced column
fn alter_column(structure: Structure, mut column: Column) -> Structure {
    let dialect = structure.dialect;
    let folded_here = structure
        .primary_key_constraint()
        .and_then(Constraint::folded_column)
        == Some(column.name.as_str());

    if folded_here && !column.primary_key {
        append_primary_key_marker(&mut column, dialect);
    }

    add_column(structure, column)
}

/// Store a primary key, folding a single-column key into its column's
/// append text; a column already carrying the marker keeps it as is
pub fn fold_primary_key(mut structure: Structure, primary_key: PrimaryKey) -> Structure {
    let dialect = structure.dialect;
    let target = match primary_key.columns() {
        [single] if structure.column(single).is_some() => Some(single.clone()),
        _ => None,
    };
    let Some(target) = target else {
        structure.set_primary_key(Some(Constraint::Discrete(primary_key)));
        return structure;
    };

    if let Some(column) = structure.column_mut(&target) {
        append_primary_key_marker(column, dialect);
    }

    structure.set_primary_key(Some(Constraint::Folded {
        name: primary_key.name,
        column: target,
    }));
    structure
}

fn append_primary_key_marker(column: &mut Column, dialect: Dialect) {
    if column.is_primary_key_info_appended(dialect) {
        return;
    }
    let marker = dialect.prepare_schema_append(true, false).unwrap_or_default();
    let append = format!("{} {}", column.append.as_deref().unwrap_or(""), marker);
    column.append = Some(append.trim().to_string());
}

/// Remove the stored primary key in whichever form it is held
pub fn unfold_primary_key(mut structure: Structure) -> Structure {
    match structure.primary_key_constraint().cloned() {
        Some(Constraint::Folded { column, .. }) => {
            if let Some(column) = structure.column_mut(&column) {
                column.remove_primary_key_marker();
            }
        }
        Some(Constraint::Discrete(key)) => {
            for name in key.columns() {
                if let Some(column) = structure.column_mut(name) {
                    column.primary_key = false;
                }
            }
        }
        None => {}
    }

    structure.set_primary_key(None);
    structure
}

/// Store an index, folding a unique index over one existing column into the
/// column's unique flag
pub fn fold_unique_index(mut structure: Structure, index: Index) -> Structure {
    let name = index.name.clone();

    if index.unique {
        if let [single] = index.columns.as_slice() {
            if let Some(column) = structure.column_mut(single) {
                column.unique = true;
                let column = single.clone();
                structure.add_index(
                    &name,
                    Constraint::Folded {
                        name: Some(name.clone()),
                        column,
                    },
                );
                return structure;
            }
        }
    }

    structure.add_index(&name, Constraint::Discrete(index));
    structure
}

/// Remove an index, clearing the unique flag it was folded into
pub fn unfold_unique_index(mut structure: Structure, name: &str) -> Structure {
    match structure.remove_index(name) {
        Some(Constraint::Folded { column, .. }) => {
            if let Some(column) = structure.column_mut(&column) {
                column.unique = false;
            }
        }
        Some(Constraint::Discrete(_)) => {}
        None => tracing::warn!(table = %structure.name, index = name, "Dropping unknown index"),
    }
    structure
}

fn set_comment(mut structure: Structure, column: &str, comment: Option<String>) -> Structure {
    match structure.column_mut(column) {
        Some(target) => target.comment = comment,
        None => tracing::warn!(table = %structure.name, column, "Commenting unknown column"),
    }
    structure
}
