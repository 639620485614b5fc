//! Structure comparator
//!
//! Compares the live structure of a table (`DB`) with the structure declared
//! by its migration history (`MIG`) and records every difference in a
//! [`Blueprint`].

use crate::schema::blueprint::Blueprint;
use crate::schema::column::{AppendMembership, Column, DefaultValue};
use crate::schema::dialect::Dialect;
use crate::schema::types::{Constraint, ForeignKey, PrimaryKey, ReferenceAction, Structure};

/// Compare two structures with the given portability setting
pub fn compare(current: &Structure, declared: &Structure, portable: bool) -> Blueprint {
    Comparator::new(portable).compare(current, declared)
}

/// Structure comparator
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    general_schema: bool,
}

impl Comparator {
    /// Create a new comparator; `general_schema` enables portable comparison
    pub fn new(general_schema: bool) -> Self {
        Self { general_schema }
    }

    /// Compare the live structure against the declared one
    pub fn compare(&self, current: &Structure, declared: &Structure) -> Blueprint {
        let mut blueprint = Blueprint::new(&current.name);

        if declared.columns().is_empty() {
            blueprint.start_from_scratch();
        }

        self.compare_columns(current, declared, &mut blueprint);
        self.compare_foreign_keys(current, declared, &mut blueprint);
        self.compare_indexes(current, declared, &mut blueprint);
        self.compare_primary_keys(current, declared, &mut blueprint);

        tracing::info!(
            table = %current.name,
            differences = blueprint.descriptions().len(),
            pending = blueprint.is_pending(),
            "Compared table structure"
        );

        blueprint
    }

    fn compare_columns(&self, current: &Structure, declared: &Structure, blueprint: &mut Blueprint) {
        let mut previous_column: Option<&str> = None;

        for (name, column) in current.columns() {
            match declared.column(name) {
                None => {
                    blueprint.add_description(format!("missing column '{}'", name));

                    let mut added = column.clone();
                    match previous_column {
                        Some(previous) => {
                            added.after = Some(previous.to_string());
                            added.first = false;
                        }
                        None => {
                            added.after = None;
                            added.first = true;
                        }
                    }
                    blueprint.add_column(added);
                }
                Some(old) => {
                    if self.compare_column(current, declared, column, old, blueprint) {
                        blueprint.alter_column(column.clone());
                        blueprint.unalter_column(old.clone());
                    }
                }
            }
            previous_column = Some(name);
        }

        for (name, column) in declared.columns() {
            if current.column(name).is_none() {
                blueprint.add_description(format!("excessive column '{}'", name));
                blueprint.drop_column(column.clone());
            }
        }
    }

    /// Compare the properties of a column present on both sides; returns
    /// whether any of them differ
    fn compare_column(
        &self,
        current: &Structure,
        declared: &Structure,
        new: &Column,
        old: &Column,
        blueprint: &mut Blueprint,
    ) -> bool {
        let name = &new.name;
        let mut different = false;
        let mut report = |property: &str, db: String, mig: String| {
            blueprint.add_description(format!(
                "different '{}' column property: {} (DB: {} != MIG: {})",
                name, property, db, mig
            ));
            different = true;
        };

        let new_type = new.column_type.canonical();
        let old_type = old.column_type.canonical();
        if new_type != old_type {
            report(
                "type",
                stringify_text(Some(new_type.as_str())),
                stringify_text(Some(old_type.as_str())),
            );
        }

        if new.nullable != old.nullable {
            report("not null", stringify_bool(!new.nullable), stringify_bool(!old.nullable));
        }

        let new_length = self.length_of(new);
        let old_length = self.length_of(old);
        if new_length != old_length {
            report(
                "length",
                stringify_text(new_length.as_deref()),
                stringify_text(old_length.as_deref()),
            );
        }

        if new.unique != old.unique {
            report("unique", stringify_bool(new.unique), stringify_bool(old.unique));
        }

        if new.unsigned != old.unsigned {
            report("unsigned", stringify_bool(new.unsigned), stringify_bool(old.unsigned));
        }

        if new.default != old.default {
            report(
                "default",
                stringify_default(new.default.as_ref()),
                stringify_default(old.default.as_ref()),
            );
        }

        if new.comment != old.comment {
            report(
                "comment",
                stringify_text(new.comment.as_deref()),
                stringify_text(old.comment.as_deref()),
            );
        }

        let new_append = normalized_append(new);
        let old_append = normalized_append(old);
        if new_append != old_append && !self.is_append_noise(current, declared, new, old) {
            report(
                "append",
                stringify_text(new_append.as_deref()),
                stringify_text(old_append.as_deref()),
            );
        }

        different
    }

    /// Length used for comparison; portable mode treats the dialect default
    /// as no length at all
    fn length_of(&self, column: &Column) -> Option<String> {
        if self.general_schema {
            column.general_length()
        } else {
            column.length()
        }
    }

    /// Whether an append difference only spells the same key membership
    fn is_append_noise(&self, current: &Structure, declared: &Structure, new: &Column, old: &Column) -> bool {
        if !self.general_schema {
            return false;
        }

        membership(current, new) == membership(declared, old)
            && new.append_residual(current.dialect) == old.append_residual(declared.dialect)
    }

    fn compare_foreign_keys(&self, current: &Structure, declared: &Structure, blueprint: &mut Blueprint) {
        for (name, foreign_key) in current.foreign_keys() {
            let Some(old) = declared.foreign_key(name) else {
                blueprint.add_description(format!("missing foreign key '{}'", name));
                blueprint.add_foreign_key(foreign_key.clone());
                continue;
            };

            let mut different = false;
            let mut report = |property: &str, db: String, mig: String| {
                blueprint.add_description(format!(
                    "different foreign key '{}' {} (DB: {} != MIG: {})",
                    name, property, db, mig
                ));
                different = true;
            };

            if foreign_key.columns != old.columns {
                report("columns", stringify_list(&foreign_key.columns), stringify_list(&old.columns));
            }
            if foreign_key.referred_table != old.referred_table {
                report(
                    "referred table",
                    stringify_text(Some(&foreign_key.referred_table)),
                    stringify_text(Some(&old.referred_table)),
                );
            }
            if foreign_key.referred_columns != old.referred_columns {
                report(
                    "referred columns",
                    stringify_list(&foreign_key.referred_columns),
                    stringify_list(&old.referred_columns),
                );
            }
            if !same_action(foreign_key.on_delete, old.on_delete, current.dialect) {
                report(
                    "ON DELETE constraint",
                    stringify_action(foreign_key.on_delete),
                    stringify_action(old.on_delete),
                );
            }
            if !same_action(foreign_key.on_update, old.on_update, current.dialect) {
                report(
                    "ON UPDATE constraint",
                    stringify_action(foreign_key.on_update),
                    stringify_action(old.on_update),
                );
            }

            if different {
                replace_foreign_key(blueprint, foreign_key, old);
            }
        }

        for (name, foreign_key) in declared.foreign_keys() {
            if current.foreign_key(name).is_none() {
                blueprint.add_description(format!("excessive foreign key '{}'", name));
                blueprint.drop_foreign_key(foreign_key.clone());
            }
        }
    }

    fn compare_indexes(&self, current: &Structure, declared: &Structure, blueprint: &mut Blueprint) {
        for index in current.indexes() {
            let name = &index.name;
            let Some(old) = declared.index(name) else {
                blueprint.add_description(format!("missing index '{}'", name));
                blueprint.add_index(index.clone());
                continue;
            };

            let mut different = false;
            if index.columns != old.columns {
                blueprint.add_description(format!(
                    "different index '{}' columns (DB: {} != MIG: {})",
                    name,
                    stringify_list(&index.columns),
                    stringify_list(&old.columns)
                ));
                different = true;
            }
            if index.unique != old.unique {
                blueprint.add_description(format!(
                    "different index '{}' uniqueness (DB: {} != MIG: {})",
                    name,
                    stringify_bool(index.unique),
                    stringify_bool(old.unique)
                ));
                different = true;
            }

            if different {
                blueprint.drop_index(old.clone());
                blueprint.add_index(index.clone());
            }
        }

        for index in declared.indexes() {
            if current.index(&index.name).is_none() {
                blueprint.add_description(format!("excessive index '{}'", index.name));
                blueprint.drop_index(index.clone());
            }
        }
    }

    /// Compare primary keys
    ///
    /// Skipped when both keys live on column level and every column whose
    /// membership differs was already recorded by the column comparison.
    fn compare_primary_keys(&self, current: &Structure, declared: &Structure, blueprint: &mut Blueprint) {
        let new_columns = current.primary_key_columns();
        let old_columns = declared.primary_key_columns();

        if new_columns == old_columns {
            return;
        }

        if is_reconciled_on_columns(current, &new_columns, declared, &old_columns, blueprint) {
            tracing::debug!(table = %current.name, "Primary key difference recorded on columns");
            return;
        }

        blueprint.add_description("different primary key definition");

        if !old_columns.is_empty() {
            blueprint.drop_primary_key(key_object(declared, &old_columns));
        }
        if !new_columns.is_empty() {
            blueprint.add_primary_key(key_object(current, &new_columns));
        }
    }
}

fn is_reconciled_on_columns(
    current: &Structure,
    new_columns: &[String],
    declared: &Structure,
    old_columns: &[String],
    blueprint: &Blueprint,
) -> bool {
    let column_level =
        |structure: &Structure, columns: &[String]| columns.is_empty() || structure.primary_key().is_none();
    if !column_level(current, new_columns) || !column_level(declared, old_columns) {
        return false;
    }

    let recorded = |name: &String| {
        blueprint.altered_columns().contains_key(name)
            || blueprint.added_columns().contains_key(name)
            || blueprint.dropped_columns().contains_key(name)
    };

    new_columns
        .iter()
        .filter(|name| !old_columns.contains(name))
        .chain(old_columns.iter().filter(|name| !new_columns.contains(name)))
        .all(recorded)
}

/// Primary key of a structure as an object, built from its key columns when
/// the structure holds it on column level
fn key_object(structure: &Structure, columns: &[String]) -> PrimaryKey {
    if let Some(key) = structure.primary_key() {
        return key.clone();
    }

    let name = match structure.primary_key_constraint() {
        Some(Constraint::Folded { name, .. }) => name.as_deref(),
        _ => None,
    };
    PrimaryKey::new(name, columns)
}

/// Primary key and auto increment membership of a column within its structure
fn membership(structure: &Structure, column: &Column) -> AppendMembership {
    let appended = column.append_membership(structure.dialect);
    let in_key_object = match structure.primary_key_constraint() {
        Some(Constraint::Discrete(key)) => !key.is_composite() && key.contains(&column.name),
        Some(Constraint::Folded { column: folded, .. }) => folded == &column.name,
        None => false,
    };
    let identity_expressible = structure.dialect.profile().identity_marker.is_some();

    AppendMembership {
        primary_key: column.primary_key || appended.primary_key || in_key_object,
        auto_increment: identity_expressible && (column.auto_increment || appended.auto_increment),
    }
}

fn normalized_append(column: &Column) -> Option<String> {
    column
        .append
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

fn replace_foreign_key(blueprint: &mut Blueprint, new: &ForeignKey, old: &ForeignKey) {
    blueprint.drop_foreign_key(old.clone());
    blueprint.add_foreign_key(new.clone());
}

/// Unset actions mean the engine default; MySQL treats RESTRICT as NO ACTION
fn same_action(new: Option<ReferenceAction>, old: Option<ReferenceAction>, dialect: Dialect) -> bool {
    let effective = |action: Option<ReferenceAction>| match action.unwrap_or(ReferenceAction::NoAction) {
        ReferenceAction::Restrict if dialect == Dialect::MySql => ReferenceAction::NoAction,
        other => other,
    };
    effective(new) == effective(old)
}

fn stringify_text(value: Option<&str>) -> String {
    match value {
        Some(value) => format!("\"{}\"", value.replace('"', "\\\"")),
        None => "NULL".to_string(),
    }
}

fn stringify_bool(value: bool) -> String {
    let text = if value { "TRUE" } else { "FALSE" };
    text.to_string()
}

fn stringify_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| stringify_text(Some(v))).collect();
    format!("[{}]", quoted.join(","))
}

fn stringify_action(action: Option<ReferenceAction>) -> String {
    stringify_text(action.map(|a| a.as_str()))
}

fn stringify_default(value: Option<&DefaultValue>) -> String {
    match value {
        None => "NULL".to_string(),
        Some(DefaultValue::Structured(value)) => value.to_string(),
        Some(other) => stringify_text(Some(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::ColumnType;
    use crate::schema::types::{Index, PrimaryKey};

    fn column(name: &str, column_type: ColumnType) -> Column {
        Column::new(name, column_type, Dialect::MySql)
    }

    #[test]
    fn identical_structures_produce_no_changes() {
        let mut structure = Structure::new("post", Dialect::MySql);
        structure.add_column(column("id", ColumnType::PrimaryKey));
        structure.add_column(column("title", ColumnType::String).with_length("100").unwrap());
        structure.add_foreign_key(ForeignKey::new("fk_author", &["author_id"], "user", &["id"]));
        structure.add_index("idx_title", Constraint::Discrete(Index::new("idx_title", &["title"], false)));

        for portable in [true, false] {
            let blueprint = compare(&structure, &structure, portable);
            assert!(!blueprint.is_pending());
            assert!(blueprint.descriptions().is_empty());
        }
    }

    #[test]
    fn reports_type_and_nullability() {
        let mut new = Structure::new("post", Dialect::MySql);
        new.add_column(column("col", ColumnType::String).nullable(false));
        let mut old = Structure::new("post", Dialect::MySql);
        old.add_column(column("col", ColumnType::Text));

        let blueprint = compare(&new, &old, true);
        assert_eq!(
            blueprint.descriptions(),
            &[
                "different 'col' column property: type (DB: \"string\" != MIG: \"text\")".to_string(),
                "different 'col' column property: not null (DB: TRUE != MIG: FALSE)".to_string(),
            ]
        );
        assert_eq!(blueprint.unaltered_columns()["col"].column_type, ColumnType::Text);
    }

    #[test]
    fn structured_defaults_compare_deeply() {
        let mut new = Structure::new("t", Dialect::PostgreSql);
        new.add_column(
            Column::new("tags", ColumnType::Json, Dialect::PostgreSql)
                .default_value(DefaultValue::Structured(serde_json::json!({"a": [1, 2]}))),
        );
        let old = new.clone();
        assert!(!compare(&new, &old, true).is_pending());

        let mut changed = new.clone();
        changed.add_column(
            Column::new("tags", ColumnType::Json, Dialect::PostgreSql)
                .default_value(DefaultValue::Structured(serde_json::json!({"a": [2, 1]}))),
        );
        let blueprint = compare(&new, &changed, true);
        assert_eq!(
            blueprint.descriptions(),
            &["different 'tags' column property: default (DB: {\"a\":[1,2]} != MIG: {\"a\":[2,1]})".to_string()]
        );
    }

    #[test]
    fn append_noise_is_ignored_only_in_portable_mode() {
        let mut new = Structure::new("t", Dialect::MySql);
        new.add_column(column("id", ColumnType::Integer).append("AUTO_INCREMENT PRIMARY KEY"));
        let mut old = Structure::new("t", Dialect::MySql);
        old.add_column(column("id", ColumnType::Integer).auto_increment(true));
        old.set_primary_key(Some(Constraint::Discrete(PrimaryKey::new(None, &["id".to_string()]))));

        assert!(!compare(&new, &old, true).is_pending());

        let specific = compare(&new, &old, false);
        assert!(specific.altered_columns().contains_key("id"));
        assert_eq!(
            specific.descriptions(),
            &["different 'id' column property: append (DB: \"AUTO_INCREMENT PRIMARY KEY\" != MIG: NULL)".to_string()]
        );
    }

    #[test]
    fn residual_append_text_is_still_compared() {
        let mut new = Structure::new("t", Dialect::MySql);
        new.add_column(column("name", ColumnType::String).append("COLLATE utf8_bin"));
        let mut old = Structure::new("t", Dialect::MySql);
        old.add_column(column("name", ColumnType::String));

        let blueprint = compare(&new, &old, true);
        assert!(blueprint.altered_columns().contains_key("name"));
    }

    #[test]
    fn index_changes_are_replaced() {
        let mut new = Structure::new("t", Dialect::MySql);
        new.add_index("idx", Constraint::Discrete(Index::new("idx", &["a", "b"], true)));
        let mut old = Structure::new("t", Dialect::MySql);
        old.add_index("idx", Constraint::Discrete(Index::new("idx", &["a"], false)));
        old.add_index("idx_gone", Constraint::Discrete(Index::new("idx_gone", &["c"], false)));

        let blueprint = compare(&new, &old, true);
        assert_eq!(
            blueprint.descriptions(),
            &[
                "different index 'idx' columns (DB: [\"a\",\"b\"] != MIG: [\"a\"])".to_string(),
                "different index 'idx' uniqueness (DB: TRUE != MIG: FALSE)".to_string(),
                "excessive index 'idx_gone'".to_string(),
            ]
        );
        assert!(blueprint.added_indexes().contains_key("idx"));
        assert!(blueprint.dropped_indexes().contains_key("idx"));
        assert!(blueprint.dropped_indexes().contains_key("idx_gone"));
    }

    #[test]
    fn foreign_key_actions_use_engine_defaults() {
        let mut new = Structure::new("t", Dialect::MySql);
        new.add_foreign_key(ForeignKey::new("fk", &["a"], "b", &["id"]).on_delete(ReferenceAction::Restrict));
        let mut old = Structure::new("t", Dialect::MySql);
        old.add_foreign_key(ForeignKey::new("fk", &["a"], "b", &["id"]));
        assert!(!compare(&new, &old, true).is_pending());

        new.add_foreign_key(ForeignKey::new("fk", &["a"], "b", &["id"]).on_delete(ReferenceAction::Cascade));
        let blueprint = compare(&new, &old, true);
        assert_eq!(
            blueprint.descriptions(),
            &["different foreign key 'fk' ON DELETE constraint (DB: \"CASCADE\" != MIG: NULL)".to_string()]
        );
        assert!(blueprint.added_foreign_keys().contains_key("fk"));
        assert!(blueprint.dropped_foreign_keys().contains_key("fk"));
    }

    #[test]
    fn dropped_primary_key_is_reported() {
        let new = Structure::new("t", Dialect::PostgreSql);
        let mut old = Structure::new("t", Dialect::PostgreSql);
        old.set_primary_key(Some(Constraint::Discrete(PrimaryKey::new(
            Some("pk_t"),
            &["a".to_string(), "b".to_string()],
        ))));

        let blueprint = compare(&new, &old, true);
        assert_eq!(blueprint.descriptions(), &["different primary key definition".to_string()]);
        assert_eq!(blueprint.dropped_primary_key().unwrap().name.as_deref(), Some("pk_t"));
        assert!(blueprint.added_primary_key().is_none());
    }

    #[test]
    fn folded_key_difference_is_reported_once() {
        let mut new = Structure::new("t", Dialect::PostgreSql);
        new.add_column(Column::new("id", ColumnType::Integer, Dialect::PostgreSql).append("PRIMARY KEY"));
        new.set_primary_key(Some(Constraint::Folded {
            name: None,
            column: "id".to_string(),
        }));
        let mut old = Structure::new("t", Dialect::PostgreSql);
        old.add_column(Column::new("id", ColumnType::Integer, Dialect::PostgreSql));

        for portable in [true, false] {
            let blueprint = compare(&new, &old, portable);
            assert_eq!(
                blueprint.descriptions(),
                &["different 'id' column property: append (DB: \"PRIMARY KEY\" != MIG: NULL)".to_string()]
            );
            assert!(blueprint.altered_columns().contains_key("id"));
            assert!(blueprint.added_primary_key().is_none());
        }
    }

    #[test]
    fn flagged_key_difference_fills_primary_key_bucket() {
        let mut new = Structure::new("t", Dialect::MySql);
        new.add_column(column("id", ColumnType::Integer).nullable(false));
        let mut old = Structure::new("t", Dialect::MySql);
        old.add_column(column("id", ColumnType::Integer).nullable(false).primary_key(true));

        let blueprint = compare(&new, &old, true);

        assert!(blueprint.is_pending());
        assert_eq!(blueprint.descriptions(), &["different primary key definition".to_string()]);
        assert_eq!(blueprint.dropped_primary_key().unwrap().columns(), &["id".to_string()]);
        assert!(blueprint.added_primary_key().is_none());
    }

    #[test]
    fn empty_declared_structure_starts_from_scratch() {
        let mut new = Structure::new("t", Dialect::Sqlite);
        new.add_column(Column::new("a", ColumnType::Integer, Dialect::Sqlite));
        let old = Structure::new("t", Dialect::Sqlite);

        assert!(compare(&new, &old, true).needs_start_from_scratch());
    }
}
