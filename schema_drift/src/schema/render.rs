//! Column definition rendering
//!
//! Renders a column as a migration builder chain such as
//! `integer(11)->notNull()->unsigned()->comment('x')`. In general (portable)
//! mode lengths equal to the dialect default are dropped and the sole column
//! of a non-composite primary key switches to its primary key variant.

use crate::schema::column::{Column, ColumnType, DefaultValue};
use crate::schema::types::PrimaryKey;

/// Renders column definitions
#[derive(Debug, Clone, Copy)]
pub struct ColumnRenderer {
    general_schema: bool,
}

impl ColumnRenderer {
    /// Create a new renderer; `general_schema` selects the portable rendering
    pub fn new(general_schema: bool) -> Self {
        Self { general_schema }
    }

    /// Render the full definition chain of a column
    ///
    /// `primary_key` is the table's discrete primary key, if any.
    pub fn render(&self, column: &Column, primary_key: Option<&PrimaryKey>) -> String {
        let variant = self.definition_type(column, primary_key);
        let implicit = variant.is_primary_key_variant();

        let length = if self.general_schema {
            column.general_length()
        } else {
            column.length()
        };
        let mut chain = vec![variant.definition().replace("{length}", length.as_deref().unwrap_or(""))];

        if !column.nullable && !implicit {
            chain.push("notNull()".to_string());
        }
        if column.unique {
            chain.push("unique()".to_string());
        }
        if column.unsigned && !implicit {
            chain.push("unsigned()".to_string());
        }
        if let Some(default) = &column.default {
            chain.push(render_default(default));
        }
        if let Some(comment) = &column.comment {
            chain.push(format!("comment('{}')", escape(comment)));
        }

        let append = if implicit && self.general_schema {
            column.append_residual(column.dialect)
        } else {
            column.append.clone().filter(|a| !a.trim().is_empty())
        };
        if let Some(append) = append {
            chain.push(format!("append('{}')", escape(&append)));
        }

        if let Some(after) = &column.after {
            chain.push(format!("after('{}')", escape(after)));
        } else if column.first {
            chain.push("first()".to_string());
        }

        chain.join("->")
    }

    /// Type whose template is used for the column
    fn definition_type(&self, column: &Column, primary_key: Option<&PrimaryKey>) -> ColumnType {
        if column.column_type.is_primary_key_variant() {
            return if self.general_schema {
                column.column_type
            } else {
                column.column_type.canonical()
            };
        }
        if !self.general_schema || !is_sole_primary_key_column(column, primary_key) {
            return column.column_type;
        }

        column
            .column_type
            .primary_key_variant(column.unsigned)
            .unwrap_or(column.column_type)
    }
}

/// Whether the column alone makes up the table's primary key
fn is_sole_primary_key_column(column: &Column, primary_key: Option<&PrimaryKey>) -> bool {
    match primary_key {
        Some(key) => !key.is_composite() && key.contains(&column.name),
        None => column.primary_key || column.is_primary_key_info_appended(column.dialect),
    }
}

fn render_default(default: &DefaultValue) -> String {
    match default {
        DefaultValue::Scalar(serde_json::Value::String(s)) => format!("defaultValue('{}')", escape(s)),
        DefaultValue::Scalar(value) | DefaultValue::Structured(value) => format!("defaultValue({})", value),
        DefaultValue::Expression(expr) => format!("defaultExpression('{}')", escape(expr)),
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
