//! Type definitions for table structure objects

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::column::Column;
use crate::schema::dialect::Dialect;

/// Represents a primary key constraint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: Option<String>,
    columns: Vec<String>,
}

impl PrimaryKey {
    /// Create a primary key; repeated column names are kept once
    pub fn new(name: Option<&str>, columns: &[String]) -> Self {
        let mut key = Self {
            name: name.map(str::to_string),
            columns: Vec::new(),
        };
        for column in columns {
            key.add_column(column);
        }
        key
    }

    /// Add a column to the key unless it is already part of it
    pub fn add_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// A key is composite when it spans more than one column
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn rename_column(&mut self, old: &str, new: &str) {
        for column in &mut self.columns {
            if column == old {
                *column = new.to_string();
            }
        }
    }

    fn remove_column(&mut self, name: &str) {
        self.columns.retain(|c| c != name);
    }
}

/// Referential action of a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferenceAction {
    /// Canonicalise any spelling (`no action`, `noaction`, `No_Action`)
    pub fn parse(value: &str) -> Option<Self> {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_uppercase();

        match compact.as_str() {
            "CASCADE" => Some(ReferenceAction::Cascade),
            "SETNULL" => Some(ReferenceAction::SetNull),
            "SETDEFAULT" => Some(ReferenceAction::SetDefault),
            "RESTRICT" => Some(ReferenceAction::Restrict),
            "NOACTION" => Some(ReferenceAction::NoAction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceAction::Cascade => "CASCADE",
            ReferenceAction::SetNull => "SET_NULL",
            ReferenceAction::SetDefault => "SET_DEFAULT",
            ReferenceAction::Restrict => "RESTRICT",
            ReferenceAction::NoAction => "NO_ACTION",
        }
    }

    /// SQL spelling of the action
    pub fn sql(&self) -> &'static str {
        match self {
            ReferenceAction::Cascade => "CASCADE",
            ReferenceAction::SetNull => "SET NULL",
            ReferenceAction::SetDefault => "SET DEFAULT",
            ReferenceAction::Restrict => "RESTRICT",
            ReferenceAction::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
    pub on_delete: Option<ReferenceAction>,
    pub on_update: Option<ReferenceAction>,
}

impl ForeignKey {
    pub fn new(name: &str, columns: &[&str], referred_table: &str, referred_columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referred_table: referred_table.to_string(),
            referred_columns: referred_columns.iter().map(|c| c.to_string()).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn on_delete(mut self, action: ReferenceAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferenceAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

/// Represents an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Index {
    pub fn new(name: &str, columns: &[&str], unique: bool) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        }
    }
}

/// How a key or unique constraint is represented in a structure
///
/// A constraint either stands on its own or is folded into the single column
/// it covers (primary key marker in the append text, unique flag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Constraint<T> {
    Discrete(T),
    Folded { name: Option<String>, column: String },
}

impl<T> Constraint<T> {
    pub fn as_discrete(&self) -> Option<&T> {
        match self {
            Constraint::Discrete(value) => Some(value),
            Constraint::Folded { .. } => None,
        }
    }

    pub fn folded_column(&self) -> Option<&str> {
        match self {
            Constraint::Discrete(_) => None,
            Constraint::Folded { column, .. } => Some(column),
        }
    }
}

/// In-memory snapshot of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    pub dialect: Dialect,
    /// Table prefix, only used when rendering the name
    pub prefix: Option<String>,
    columns: IndexMap<String, Column>,
    primary_key: Option<Constraint<PrimaryKey>>,
    foreign_keys: IndexMap<String, ForeignKey>,
    indexes: IndexMap<String, Constraint<Index>>,
}

impl Structure {
    /// Create a new empty structure
    pub fn new(name: &str, dialect: Dialect) -> Self {
        Self {
            name: name.to_string(),
            dialect,
            prefix: None,
            columns: IndexMap::new(),
            primary_key: None,
            foreign_keys: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    pub fn columns(&self) -> &IndexMap<String, Column> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(name)
    }

    /// Insert a column, replacing any column of the same name in place
    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Replace all columns, keeping the given order
    pub fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns.into_iter().map(|c| (c.name.clone(), c)).collect();
    }

    /// Remove a column along with its primary key membership
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let removed = self.columns.shift_remove(name)?;

        let key_emptied = match &mut self.primary_key {
            Some(Constraint::Discrete(key)) => {
                key.remove_column(name);
                key.is_empty()
            }
            Some(Constraint::Folded { column, .. }) => column == name,
            None => false,
        };
        if key_emptied {
            self.primary_key = None;
        }
        self.indexes
            .retain(|_, index| index.folded_column() != Some(name));

        Some(removed)
    }

    /// Rename a column in place and in every constraint referring to it
    ///
    /// Refused when `old` is unknown or `new` already names another column.
    pub fn rename_column(&mut self, old: &str, new: &str) -> bool {
        let Some(position) = self.columns.get_index_of(old) else {
            return false;
        };
        if old != new && self.columns.contains_key(new) {
            tracing::warn!(table = %self.name, column = old, target = new, "Rename target column already exists");
            return false;
        }

        let columns = std::mem::take(&mut self.columns);
        self.columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, (name, mut column))| {
                if i == position {
                    column.name = new.to_string();
                    (new.to_string(), column)
                } else {
                    (name, column)
                }
            })
            .collect();

        match &mut self.primary_key {
            Some(Constraint::Discrete(key)) => key.rename_column(old, new),
            Some(Constraint::Folded { column, .. }) if column == old => *column = new.to_string(),
            _ => {}
        }
        for index in self.indexes.values_mut() {
            match index {
                Constraint::Discrete(index) => {
                    for column in &mut index.columns {
                        if column == old {
                            *column = new.to_string();
                        }
                    }
                }
                Constraint::Folded { column, .. } if column == old => *column = new.to_string(),
                Constraint::Folded { .. } => {}
            }
        }
        for foreign_key in self.foreign_keys.values_mut() {
            for column in &mut foreign_key.columns {
                if column == old {
                    *column = new.to_string();
                }
            }
        }

        true
    }

    /// Primary key when stored as a discrete object
    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref().and_then(Constraint::as_discrete)
    }

    /// Primary key in whichever form the structure holds it
    pub fn primary_key_constraint(&self) -> Option<&Constraint<PrimaryKey>> {
        self.primary_key.as_ref()
    }

    pub fn set_primary_key(&mut self, primary_key: Option<Constraint<PrimaryKey>>) {
        self.primary_key = primary_key;
    }

    /// Columns making up the primary key, whatever its representation
    ///
    /// Without a discrete key the columns flagged as primary key or carrying
    /// the dialect's primary key append text are used, in column order.
    pub fn primary_key_columns(&self) -> Vec<String> {
        match &self.primary_key {
            Some(Constraint::Discrete(key)) => key.columns().to_vec(),
            Some(Constraint::Folded { column, .. }) => vec![column.clone()],
            None => self
                .columns
                .values()
                .filter(|c| c.primary_key || c.is_primary_key_info_appended(self.dialect))
                .map(|c| c.name.clone())
                .collect(),
        }
    }

    /// Whether the primary key is expressed on columns rather than as an object
    pub fn is_primary_key_column_level(&self) -> bool {
        self.primary_key().is_none() && !self.primary_key_columns().is_empty()
    }

    pub fn foreign_keys(&self) -> &IndexMap<String, ForeignKey> {
        &self.foreign_keys
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.get(name)
    }

    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) {
        self.foreign_keys.insert(foreign_key.name.clone(), foreign_key);
    }

    pub fn remove_foreign_key(&mut self, name: &str) -> Option<ForeignKey> {
        self.foreign_keys.shift_remove(name)
    }

    /// Indexes stored as discrete objects
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values().filter_map(Constraint::as_discrete)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name).and_then(Constraint::as_discrete)
    }

    pub fn index_constraint(&self, name: &str) -> Option<&Constraint<Index>> {
        self.indexes.get(name)
    }

    pub fn add_index(&mut self, name: &str, index: Constraint<Index>) {
        self.indexes.insert(name.to_string(), index);
    }

    pub fn remove_index(&mut self, name: &str) -> Option<Constraint<Index>> {
        self.indexes.shift_remove(name)
    }

    /// Drop every column and constraint, keeping name and dialect
    pub fn clear(&mut self) {
        self.columns.clear();
        self.primary_key = None;
        self.foreign_keys.clear();
        self.indexes.clear();
    }

    /// Table name as rendered in migrations
    ///
    /// With `use_prefix` the name is wrapped as `{{%name}}` and the configured
    /// prefix is stripped from it.
    pub fn render_name(&self, use_prefix: bool) -> String {
        if !use_prefix {
            return self.name.clone();
        }

        let bare: &str = match &self.prefix {
            Some(prefix) if !prefix.is_empty() => self.name.strip_prefix(prefix.as_str()).unwrap_or(&self.name),
            _ => &self.name,
        };
        format!("{{{{%{}}}}}", bare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::ColumnType;

    fn structure() -> Structure {
        let mut structure = Structure::new("post", Dialect::MySql);
        structure.add_column(Column::new("id", ColumnType::Integer, Dialect::MySql));
        structure.add_column(Column::new("title", ColumnType::String, Dialect::MySql));
        structure.add_column(Column::new("body", ColumnType::Text, Dialect::MySql));
        structure
    }

    #[test]
    fn primary_key_deduplicates_columns() {
        let key = PrimaryKey::new(None, &["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(key.columns(), &["a".to_string(), "b".to_string()]);
        assert!(key.is_composite());
    }

    #[test]
    fn reference_actions_are_canonicalised() {
        assert_eq!(ReferenceAction::parse("noaction"), Some(ReferenceAction::NoAction));
        assert_eq!(ReferenceAction::parse("set null"), Some(ReferenceAction::SetNull));
        assert_eq!(ReferenceAction::parse("Cascade"), Some(ReferenceAction::Cascade));
        assert_eq!(ReferenceAction::parse("sometimes"), None);
        assert_eq!(ReferenceAction::NoAction.to_string(), "NO_ACTION");
    }

    #[test]
    fn rename_column_keeps_position_and_constraints() {
        let mut structure = structure();
        structure.set_primary_key(Some(Constraint::Discrete(PrimaryKey::new(None, &["id".to_string()]))));
        structure.add_index("idx_title", Constraint::Discrete(Index::new("idx_title", &["title"], false)));

        assert!(structure.rename_column("title", "headline"));
        assert!(!structure.rename_column("missing", "other"));

        let names: Vec<_> = structure.columns().keys().cloned().collect();
        assert_eq!(names, vec!["id", "headline", "body"]);
        assert_eq!(structure.column("headline").unwrap().name, "headline");
        assert_eq!(structure.index("idx_title").unwrap().columns, vec!["headline".to_string()]);

        structure.rename_column("id", "post_id");
        assert_eq!(structure.primary_key_columns(), vec!["post_id".to_string()]);
    }

    #[test]
    fn rename_onto_existing_column_is_refused() {
        let mut structure = structure();

        assert!(!structure.rename_column("title", "body"));

        let names: Vec<_> = structure.columns().keys().cloned().collect();
        assert_eq!(names, vec!["id", "title", "body"]);
        assert_eq!(structure.column("body").unwrap().column_type, ColumnType::Text);
        assert_eq!(structure.column("title").unwrap().column_type, ColumnType::String);
    }

    #[test]
    fn removing_column_drops_key_membership() {
        let mut structure = structure();
        structure.set_primary_key(Some(Constraint::Folded {
            name: None,
            column: "id".to_string(),
        }));
        structure.remove_column("id");
        assert!(structure.primary_key_constraint().is_none());
        assert_eq!(structure.columns().len(), 2);
    }

    #[test]
    fn column_level_primary_key_is_detected() {
        let mut structure = structure();
        structure.add_column(Column::new("id", ColumnType::Integer, Dialect::MySql).append("PRIMARY KEY"));
        assert!(structure.is_primary_key_column_level());
        assert_eq!(structure.primary_key_columns(), vec!["id".to_string()]);
    }

    #[test]
    fn renders_prefixed_name() {
        let mut structure = structure();
        structure.name = "app_post".to_string();
        structure.prefix = Some("app_".to_string());
        assert_eq!(structure.render_name(true), "{{%post}}");
        assert_eq!(structure.render_name(false), "app_post");
    }
}
