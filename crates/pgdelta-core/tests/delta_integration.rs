//! Integration tests for the delta engine and statement synthesizer.
//!
//! Configurations are written in their JSON shape or with the column
//! helpers, diffed, and the resulting scripts compared verbatim.

mod common;

use common::{assert_same_columns, config, database, qualified_tables, schema, table};
use pgdelta_core::builder::{ConfigurationBuilder, RawColumn};
use pgdelta_core::catalog::{BASE_TABLE, Catalog, CatalogColumn, CatalogConstraint};
use pgdelta_core::delta::columns_equivalent;
use pgdelta_core::state::SchemaState;
use pgdelta_core::typemap::{RawConstraint, TypeDescriptor, bigint, uuid, varchar};
use pgdelta_core::{
    CatalogOptions, Configuration, DeltaError, compute_delta, compute_migration_script,
    fold_catalog, synthesize,
};

// =============================================================================
// Fixtures
// =============================================================================

const USERS_V1: &str = r#"{
    "app": {
        "tables": {
            "users": {
                "columns": {
                    "id": {"data_type": "bigint", "data_type_stmt": "bigint",
                           "nullable": false, "constraints": [{"type": "p"}]},
                    "email": {"data_type": "character varying", "data_type_stmt": "varchar(32)",
                              "character_maximum_length": 32, "nullable": false},
                    "legacy_flag": {"data_type": "bigint", "data_type_stmt": "bigint"}
                }
            }
        }
    }
}"#;

fn users_v1() -> Configuration {
    config(USERS_V1)
}

fn users_v2() -> Configuration {
    database(vec![
        (
            "audit",
            schema(vec![("events", table(vec![("id", uuid().primary_key())]))]),
        ),
        (
            "app",
            schema(vec![
                (
                    "users",
                    table(vec![
                        ("id", bigint().primary_key()),
                        ("email", varchar(Some(64))),
                        ("age", bigint().not_null()),
                    ]),
                ),
                (
                    "orders",
                    table(vec![
                        ("id", bigint().primary_key()),
                        ("user_id", bigint().not_null()),
                    ]),
                ),
            ]),
        ),
    ])
}

fn configurations() -> Vec<Configuration> {
    vec![
        Configuration::new(),
        config(r#"{"app": {"tables": {}}}"#),
        users_v1(),
        users_v2(),
    ]
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn new_schema_only() {
    let old = Configuration::new();
    let new = config(r#"{"app": {"tables": {}}}"#);

    let delta = compute_delta(&old, &new).unwrap();
    assert_eq!(delta.schemas.new, ["app"]);
    assert!(delta.tables.new.is_empty());
    assert!(delta.tables.alter.is_empty());

    assert_eq!(compute_migration_script(&old, &new).unwrap(), "CREATE SCHEMA app;");
}

#[test]
fn new_table_inlines_default_primary_key() {
    let old = config(r#"{"app": {"tables": {}}}"#);
    let new = config(
        r#"{"app": {"tables": {"users": {"columns": {"id": {
            "data_type": "bigint", "data_type_stmt": "bigint",
            "nullable": false, "constraints": [{"type": "p"}]
        }}}}}}"#,
    );

    let delta = compute_delta(&old, &new).unwrap();
    assert!(delta.schemas.new.is_empty());
    assert_eq!(delta.tables.new.len(), 1);
    let pk = delta.tables.new[0]
        .constraints
        .as_ref()
        .and_then(|c| c.new_pk.as_ref())
        .unwrap();
    assert_eq!(pk.name, "users_pkey");
    assert_eq!(pk.columns, ["id"]);

    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "CREATE TABLE app.users (\n\tid bigint PRIMARY KEY\n);"
    );
}

#[test]
fn nullability_change_alters_column() {
    let old = users_v1();
    let mut new = users_v1();
    new.schemas["app"].tables["users"].columns["email"].nullable = true;

    let delta = compute_delta(&old, &new).unwrap();
    assert_eq!(delta.tables.alter.len(), 1);
    let altered: Vec<&String> = delta.tables.alter[0].alter_column_definitions.keys().collect();
    assert_eq!(altered, ["email"]);

    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "ALTER TABLE app.users \nALTER COLUMN email TYPE varchar(32),\nALTER COLUMN email DROP NOT NULL;"
    );
}

#[test]
fn added_column() {
    let old = users_v1();
    let mut new = users_v1();
    new.schemas["app"].tables["users"]
        .columns
        .insert("age".to_string(), bigint());

    let delta = compute_delta(&old, &new).unwrap();
    let added: Vec<&String> = delta.tables.alter[0].new_column_definitions.keys().collect();
    assert_eq!(added, ["age"]);
    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "ALTER TABLE app.users \nADD COLUMN age bigint;"
    );

    new.schemas["app"].tables["users"].columns["age"].nullable = false;
    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "ALTER TABLE app.users \nADD COLUMN age bigint NOT NULL;"
    );
}

#[test]
fn dropped_column() {
    let old = users_v1();
    let mut new = users_v1();
    new.schemas["app"].tables["users"]
        .columns
        .shift_remove("legacy_flag");

    let delta = compute_delta(&old, &new).unwrap();
    let deleted: Vec<&String> = delta.tables.alter[0].delete_column_definitions.keys().collect();
    assert_eq!(deleted, ["legacy_flag"]);
    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "ALTER TABLE app.users \nDROP COLUMN legacy_flag;"
    );
}

#[test]
fn renamed_primary_key_drops_then_recreates() {
    let old = users_v1();
    let mut new = users_v1();
    let users = &mut new.schemas["app"].tables["users"];
    users.columns["id"] = bigint().primary_key_named("users_pk_v2");
    users.columns.insert("age".to_string(), bigint());

    let delta = compute_delta(&old, &new).unwrap();
    let constraints = delta.tables.alter[0].constraints.as_ref().unwrap();
    assert_eq!(constraints.drop_pk.as_ref().unwrap().name, "users_pkey");
    assert_eq!(constraints.new_pk.as_ref().unwrap().name, "users_pk_v2");

    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "ALTER TABLE app.users DROP CONSTRAINT IF EXISTS users_pkey CASCADE;\n\n\
         ALTER TABLE app.users \nADD COLUMN age bigint;\n\n\
         ALTER TABLE app.users ADD CONSTRAINT users_pk_v2 PRIMARY KEY(id);"
    );
}

#[test]
fn full_migration_script() {
    assert_eq!(
        compute_migration_script(&users_v1(), &users_v2()).unwrap(),
        "CREATE SCHEMA audit;\n\n\
         CREATE TABLE audit.events (\n\tid uuid PRIMARY KEY\n);\n\n\
         CREATE TABLE app.orders (\n\tid bigint PRIMARY KEY,\n\tuser_id bigint NOT NULL\n);\n\n\
         ALTER TABLE app.users \nADD COLUMN age bigint NOT NULL;\n\n\
         ALTER TABLE app.users \nALTER COLUMN email TYPE varchar(64),\nALTER COLUMN email DROP NOT NULL;\n\n\
         ALTER TABLE app.users \nDROP COLUMN legacy_flag;"
    );
}

#[test]
fn composite_primary_key_added_after_create() {
    let old = config(r#"{"app": {}}"#);
    let new = database(vec![(
        "app",
        schema(vec![(
            "memberships",
            table(vec![
                ("user_id", bigint().primary_key()),
                ("group_id", bigint().primary_key()),
                ("role", varchar(Some(16))),
            ]),
        )]),
    )]);

    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "CREATE TABLE app.memberships (\n\tuser_id bigint NOT NULL,\n\tgroup_id bigint NOT NULL,\n\trole varchar(16)\n);\n\n\
         ALTER TABLE app.memberships ADD CONSTRAINT memberships_pkey PRIMARY KEY(user_id,group_id);"
    );
}

#[test]
fn dropped_primary_key() {
    let old = users_v1();
    let mut new = users_v1();
    new.schemas["app"].tables["users"].columns["id"] = bigint().not_null();

    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "ALTER TABLE app.users DROP CONSTRAINT IF EXISTS users_pkey CASCADE;"
    );
}

#[test]
fn missing_baseline_schema_and_tables_are_never_dropped() {
    let delta = compute_delta(&users_v2(), &users_v1()).unwrap();
    assert!(delta.schemas.new.is_empty());
    assert!(delta.tables.new.is_empty());
    // users exists on both sides; only its columns move
    assert_eq!(delta.tables.alter.len(), 1);
    assert!(!compute_migration_script(&users_v2(), &users_v1())
        .unwrap()
        .contains("audit"));
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn identical_configurations_produce_empty_delta() {
    for x in configurations() {
        let delta = compute_delta(&x, &x).unwrap();
        assert!(delta.schemas.new.is_empty());
        assert!(delta.tables.new.is_empty());
        assert!(delta.tables.alter.is_empty());
        assert_eq!(compute_migration_script(&x, &x).unwrap(), "");
    }
}

#[test]
fn delta_follows_desired_order() {
    let columns = || table(vec![("id", bigint())]);
    let changed = || table(vec![("id", bigint().not_null())]);

    let old = database(vec![
        ("z", schema(vec![("t2", columns()), ("t1", columns())])),
        ("a", schema(vec![("t2", columns()), ("t1", columns())])),
    ]);
    let new = database(vec![
        ("a", schema(vec![("t1", changed()), ("t3", columns()), ("t2", changed())])),
        ("m", schema(vec![("t1", columns())])),
        ("z", schema(vec![("t1", changed()), ("t2", changed())])),
    ]);

    let delta = compute_delta(&old, &new).unwrap();
    assert_eq!(delta.schemas.new, ["m"]);
    let created: Vec<String> = delta.tables.new.iter().map(|t| t.qualified_name()).collect();
    assert_eq!(created, ["a.t3", "m.t1"]);
    let altered: Vec<String> = delta.tables.alter.iter().map(|t| t.qualified_name()).collect();
    assert_eq!(altered, ["a.t1", "a.t2", "z.t1", "z.t2"]);
}

#[test]
fn columns_partitioned_exactly_once() {
    let pairs = [
        (users_v1(), users_v2()),
        (users_v2(), users_v1()),
        (users_v1(), users_v1()),
    ];
    for (old, new) in &pairs {
        let delta = compute_delta(old, new).unwrap();
        for (schema_name, schema) in &new.schemas {
            for (table_name, new_table) in &schema.tables {
                let Some(old_table) = old.table(schema_name, table_name) else {
                    continue;
                };
                let altered = delta
                    .tables
                    .alter
                    .iter()
                    .find(|t| t.schema_name == *schema_name && t.table_name == *table_name);

                let mut all: Vec<&String> = old_table.columns.keys().collect();
                all.extend(
                    new_table
                        .columns
                        .keys()
                        .filter(|c| !old_table.columns.contains_key(*c)),
                );

                for column in all {
                    let buckets = altered.map_or(0, |t| {
                        usize::from(t.new_column_definitions.contains_key(column))
                            + usize::from(t.alter_column_definitions.contains_key(column))
                            + usize::from(t.delete_column_definitions.contains_key(column))
                    });
                    let pair = (old_table.columns.get(column), new_table.columns.get(column));
                    let unchanged = match pair {
                        (Some(a), Some(b)) => columns_equivalent(a, b),
                        _ => false,
                    };
                    assert_eq!(
                        buckets + usize::from(unchanged),
                        1,
                        "column {schema_name}.{table_name}.{column}"
                    );
                }
            }
        }
    }
}

#[test]
fn replayed_delta_reaches_desired_columns() {
    let cases = [
        (Configuration::new(), users_v1()),
        (users_v1(), users_v2()),
        (users_v2(), users_v1()),
    ];
    for (old, new) in cases {
        let delta = compute_delta(&old, &new).unwrap();
        let mut state = SchemaState::new(old.clone());
        state.apply_delta(&delta).unwrap();
        let replayed = state.into_configuration();

        assert_same_columns(&replayed, &new);
        assert!(compute_delta(&replayed, &new).unwrap().is_empty());
    }
}

#[test]
fn replay_keeps_unlisted_tables() {
    let old = users_v2();
    let new = users_v1();
    let mut state = SchemaState::new(old.clone());
    state
        .apply_delta(&compute_delta(&old, &new).unwrap())
        .unwrap();
    assert_eq!(
        qualified_tables(state.configuration()),
        ["audit.events", "app.users", "app.orders"]
    );
}

// =============================================================================
// Incomplete configurations
// =============================================================================

#[test]
fn missing_type_statement_counts_as_altered() {
    let mut old = users_v1();
    old.schemas["app"].tables["users"].columns["email"].data_type_stmt = None;
    let new = users_v1();

    let delta = compute_delta(&old, &new).unwrap();
    assert!(delta.tables.alter[0]
        .alter_column_definitions
        .contains_key("email"));
    assert_eq!(
        compute_migration_script(&old, &new).unwrap(),
        "ALTER TABLE app.users \nALTER COLUMN email TYPE varchar(32),\nALTER COLUMN email SET NOT NULL;"
    );
}

#[test]
fn missing_type_statement_in_desired_fails_synthesis() {
    let old = config(r#"{"app": {}}"#);
    let new = config(r#"{"app": {"tables": {"t": {"columns": {"id": {"data_type": "bigint"}}}}}}"#);

    let delta = compute_delta(&old, &new).unwrap();
    let err = synthesize(&delta).unwrap_err();
    assert_eq!(
        err,
        DeltaError::MissingTypeStatement {
            table: "app.t".to_string(),
            column: "id".to_string(),
        }
    );
}

#[test]
fn malformed_primary_key_fails_delta() {
    let new = config(
        r#"{"app": {"tables": {"t": {
            "columns": {"id": {"data_type": "bigint", "data_type_stmt": "bigint"}},
            "constraints": {"primary_key": {"name": "t_pkey"}}
        }}}}"#,
    );
    let err = compute_delta(&Configuration::new(), &new).unwrap_err();
    assert!(matches!(err, DeltaError::MalformedConstraint { .. }));
}

#[test]
fn views_are_not_diffed() {
    let old = config(r#"{"app": {"tables": {}}}"#);
    let new = config(
        r#"{"app": {"tables": {}, "views": {"v": {"columns": {
            "id": {"data_type": "bigint", "data_type_stmt": "bigint"}
        }}}}}"#,
    );
    assert!(compute_delta(&old, &new).unwrap().is_empty());
}

// =============================================================================
// Producers
// =============================================================================

/// Catalog rows for `app.users(id bigint PRIMARY KEY, email varchar(32) NOT
/// NULL, token uuid)`.
fn users_catalog() -> Catalog {
    let column = |name: &str, data_type: &str, length: Option<i32>, nullable: &str| CatalogColumn {
        table_schema: "app".to_string(),
        table_name: "users".to_string(),
        table_type: BASE_TABLE.to_string(),
        column_name: name.to_string(),
        data_type: data_type.to_string(),
        character_maximum_length: length,
        is_nullable: nullable.to_string(),
    };
    Catalog {
        schemas: vec!["public".to_string(), "app".to_string()],
        columns: vec![
            column("id", "bigint", None, "NO"),
            column("email", "character varying", Some(32), "NO"),
            column("token", "uuid", None, "YES"),
        ],
        constraints: vec![CatalogConstraint {
            name: "users_pkey".to_string(),
            constraint_type: "p".to_string(),
            schema: "app".to_string(),
            table: "users".to_string(),
            column: "id".to_string(),
        }],
    }
}

#[test]
fn ingested_and_introspected_configurations_compare_equal() {
    let mut builder = ConfigurationBuilder::new();
    builder
        .table(
            "app",
            "users",
            [
                RawColumn::new("id", TypeDescriptor::new(["pg_catalog", "int8"]))
                    .with_constraint(RawConstraint::PrimaryKey { name: None }),
                RawColumn::new(
                    "email",
                    TypeDescriptor::new(["pg_catalog", "varchar"]).with_modifiers([32]),
                )
                .with_constraint(RawConstraint::NotNull),
                RawColumn::new("token", TypeDescriptor::new(["uuid"])),
            ],
        )
        .unwrap();
    let ingested = builder.build();

    let introspected = fold_catalog(&users_catalog(), &CatalogOptions::default()).unwrap();

    let delta = compute_delta(&introspected, &ingested).unwrap();
    assert!(delta.is_empty(), "unexpected delta: {delta:?}");
}

#[test]
fn json_configuration_without_nullable_matches_live_database() {
    let desired = config(
        r#"{"app": {"tables": {"users": {"columns": {
            "id": {"data_type": "bigint", "data_type_stmt": "bigint",
                   "constraints": [{"type": "p"}]},
            "email": {"data_type": "character varying", "data_type_stmt": "varchar(32)",
                      "character_maximum_length": 32, "nullable": false},
            "token": {"data_type": "uuid", "data_type_stmt": "uuid"}
        }}}}}"#,
    );
    let live = fold_catalog(&users_catalog(), &CatalogOptions::default()).unwrap();

    let delta = compute_delta(&live, &desired).unwrap();
    assert!(delta.is_empty(), "unexpected delta: {delta:?}");
    assert_eq!(compute_migration_script(&live, &desired).unwrap(), "");
}

#[test]
fn json_composite_key_without_nullable_creates_not_null_columns() {
    let desired = config(
        r#"{"app": {"tables": {"memberships": {"columns": {
            "user_id": {"data_type": "bigint", "data_type_stmt": "bigint",
                        "constraints": [{"type": "p", "name": "memberships_pk"}]},
            "group_id": {"data_type": "bigint", "data_type_stmt": "bigint",
                         "constraints": [{"type": "p", "name": "memberships_pk"}]}
        }}}}}"#,
    );
    let script = compute_migration_script(&config(r#"{"app": {}}"#), &desired).unwrap();
    assert_eq!(
        script,
        "CREATE TABLE app.memberships (\n\tuser_id bigint NOT NULL,\n\tgroup_id bigint NOT NULL\n);\n\n\
         ALTER TABLE app.memberships ADD CONSTRAINT memberships_pk PRIMARY KEY(user_id,group_id);"
    );
}

#[test]
fn delta_serializes_to_nested_shape() {
    let delta = compute_delta(&Configuration::new(), &config(r#"{"app": {}}"#)).unwrap();
    let value = serde_json::to_value(&delta).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"schema": {"new": ["app"]}, "tables": {"new": [], "alter": []}})
    );
}
