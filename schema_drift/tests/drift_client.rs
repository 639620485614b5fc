//! End-to-end comparisons through the drift client

use pretty_assertions::assert_eq;
use rstest::*;
use serde_json::json;
use std::io::Write;

use schema_drift::config::{ComparisonConfig, Config, NamingConfig};
use schema_drift::db::{ColumnMetadata, ForeignKeyMetadata, IndexMetadata, TableMetadata};
use schema_drift::history::{ChangeMethod, StructureChange};
use schema_drift::schema::ColumnType;
use schema_drift::{DriftClient, Error, MemoryHistory, MemoryIntrospector};

fn column(name: &str, column_type: ColumnType, size: Option<i64>, nullable: bool) -> ColumnMetadata {
    let mut column = ColumnMetadata::new(name, column_type);
    column.size = size;
    column.nullable = nullable;
    column
}

fn live_user() -> TableMetadata {
    let mut id = column("id", ColumnType::Integer, Some(11), false);
    id.primary_key = true;
    id.auto_increment = true;

    TableMetadata {
        name: "user".to_string(),
        columns: vec![id, column("email", ColumnType::String, Some(255), false)],
        primary_key: None,
        indexes: vec![IndexMetadata {
            name: "PRIMARY".to_string(),
            columns: vec!["id".to_string()],
            unique: true,
            primary: true,
        }],
        foreign_keys: vec![],
    }
}

fn live_post() -> TableMetadata {
    let mut id = column("id", ColumnType::Integer, Some(11), false);
    id.primary_key = true;
    id.auto_increment = true;

    TableMetadata {
        name: "post".to_string(),
        columns: vec![
            id,
            column("title", ColumnType::String, Some(255), false),
            column("author_id", ColumnType::Integer, Some(11), true),
        ],
        primary_key: None,
        indexes: vec![
            IndexMetadata {
                name: "PRIMARY".to_string(),
                columns: vec!["id".to_string()],
                unique: true,
                primary: true,
            },
            IndexMetadata {
                name: "idx_title".to_string(),
                columns: vec!["title".to_string()],
                unique: true,
                primary: false,
            },
        ],
        foreign_keys: vec![ForeignKeyMetadata {
            name: "fk_author".to_string(),
            columns: vec!["author_id".to_string()],
            referred_table: "user".to_string(),
            referred_columns: vec!["id".to_string()],
            on_delete: Some("CASCADE".to_string()),
            on_update: Some("RESTRICT".to_string()),
        }],
    }
}

fn history() -> MemoryHistory {
    let mut history = MemoryHistory::new();
    history.push(StructureChange::new(
        "user",
        ChangeMethod::CreateTable,
        json!({"columns": {"id": {"type": "pk"}, "email": {"type": "string", "not_null": true}}}),
    ));
    history.push(StructureChange::new(
        "post",
        ChangeMethod::CreateTable,
        json!({"columns": {
            "id": {"type": "pk"},
            "title": {"type": "string", "length": 255, "not_null": true},
            "author_id": {"type": "integer"}
        }}),
    ));
    history.push(StructureChange::new(
        "post",
        ChangeMethod::AddForeignKey,
        json!({
            "name": "fk_author",
            "columns": ["author_id"],
            "referred_table": "user",
            "referred_columns": ["id"],
            "on_delete": "CASCADE"
        }),
    ));
    history.push(StructureChange::new(
        "post",
        ChangeMethod::CreateIndex,
        json!({"name": "idx_title", "columns": ["title"], "unique": true}),
    ));
    history
}

fn introspector(post: TableMetadata) -> MemoryIntrospector {
    let mut introspector = MemoryIntrospector::new(schema_drift::Dialect::MySql).with_engine_version("8.0.21");
    introspector.add_table(post);
    introspector.add_table(live_user());
    introspector
}

fn client(post: TableMetadata, portable: bool) -> DriftClient {
    let config = Config {
        comparison: ComparisonConfig {
            portable,
            ..ComparisonConfig::default()
        },
        ..Config::default()
    };

    DriftClient::builder()
        .config(config)
        .introspector(introspector(post))
        .history(history())
        .build()
        .unwrap()
}

#[test]
fn table_matching_its_history_has_no_drift() {
    let client = client(live_post(), true);

    let blueprint = client.compare_table("post").unwrap();

    assert_eq!(blueprint.descriptions(), &[] as &[String]);
    assert!(!blueprint.is_pending());
}

#[test]
fn specific_comparison_reports_dialect_details() {
    let client = client(live_post(), false);

    let blueprint = client.compare_table("post").unwrap();

    assert!(blueprint.is_pending());
    assert!(blueprint
        .descriptions()
        .contains(&"different 'id' column property: append (DB: \"AUTO_INCREMENT PRIMARY KEY\" != MIG: NULL)".to_string()));
}

#[test]
fn drifted_table_is_described() {
    let mut post = live_post();
    post.columns[1].size = Some(200);
    post.columns.insert(2, column("slug", ColumnType::String, Some(64), true));
    let client = client(post, true);

    let blueprint = client.compare_table("post").unwrap();

    assert_eq!(
        blueprint.descriptions(),
        &[
            "different 'title' column property: length (DB: \"200\" != MIG: NULL)".to_string(),
            "missing column 'slug'".to_string(),
        ]
    );
    assert_eq!(blueprint.added_columns()["slug"].after.as_deref(), Some("title"));
    assert_eq!(
        client.renderer().render(&blueprint.added_columns()["slug"], None),
        "string(64)->after('title')"
    );
}

#[test]
fn tables_are_compared_in_creation_order() {
    let client = client(live_post(), true);

    let blueprints = client
        .compare_tables(&["post".to_string(), "user".to_string()])
        .unwrap();

    let order: Vec<_> = blueprints.iter().map(|b| b.table_name.as_str()).collect();
    assert_eq!(order, vec!["user", "post"]);
    assert!(blueprints.iter().all(|b| !b.is_pending()));
}

#[test]
fn table_without_history_starts_from_scratch() {
    let mut introspector = introspector(live_post());
    let mut extra = live_user();
    extra.name = "audit".to_string();
    introspector.add_table(extra);

    let client = DriftClient::builder()
        .introspector(introspector)
        .history(history())
        .build()
        .unwrap();

    let blueprint = client.compare_table("audit").unwrap();
    assert!(blueprint.needs_start_from_scratch());
    assert_eq!(blueprint.added_columns().len(), 2);
    assert!(blueprint.added_columns()["id"].first);
}

#[test]
fn missing_live_table_is_an_introspection_error() {
    let client = client(live_post(), true);
    assert!(matches!(client.compare_table("ghost"), Err(Error::IntrospectionError(_))));
}

#[test]
fn malformed_history_fails_the_build() {
    let mut history = history();
    history.push(StructureChange::new("post", ChangeMethod::RenameColumn, json!({"old": "title"})));

    let client = DriftClient::builder()
        .introspector(introspector(live_post()))
        .history(history)
        .build()
        .unwrap();

    match client.compare_table("post") {
        Err(Error::DecodeError { method, data, .. }) => {
            assert_eq!(method, "renameColumn");
            assert_eq!(data, json!({"old": "title"}));
        }
        other => panic!("expected a decode error, got {:?}", other.map(|b| b.table_name)),
    }
}

#[rstest]
#[case(true, false)]
#[case(false, true)]
fn missing_collaborators_are_configuration_errors(#[case] with_introspector: bool, #[case] with_history: bool) {
    let mut builder = DriftClient::builder();
    if with_introspector {
        builder = builder.introspector(introspector(live_post()));
    }
    if with_history {
        builder = builder.history(history());
    }

    assert!(matches!(builder.build(), Err(Error::ConfigError(_))));
}

#[test]
fn prefixed_names_are_rendered() {
    let config = Config {
        naming: Some(NamingConfig {
            table_prefix: Some("app_".to_string()),
            use_prefix: true,
        }),
        ..Config::default()
    };
    let mut post = live_post();
    post.name = "app_post".to_string();

    let mut introspector = MemoryIntrospector::new(schema_drift::Dialect::MySql);
    introspector.add_table(post);
    let client = DriftClient::builder()
        .config(config)
        .introspector(introspector)
        .history(MemoryHistory::new())
        .build()
        .unwrap();

    let structure = client.live_structure("app_post").unwrap();
    assert_eq!(client.render_table_name(&structure), "{{%post}}");
}

#[test]
fn loads_client_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[comparison]\ndialect = \"mysql\"\nportable = false").unwrap();

    let client = schema_drift::init(file.path().to_str().unwrap())
        .unwrap()
        .introspector(introspector(live_post()))
        .history(history())
        .build()
        .unwrap();

    assert!(!client.config().comparison.portable);
    assert_eq!(client.engine_version().as_deref(), Some("8.0.21"));
}
