#![allow(dead_code)]

use pgdelta_core::config::{ColumnConfig, Configuration, SchemaConfig, TableConfig};

/// Parses a configuration from its JSON shape.
pub fn config(json: &str) -> Configuration {
    serde_json::from_str(json).unwrap_or_else(|e| panic!("Invalid configuration: {json}\nError: {e}"))
}

pub fn table(columns: Vec<(&str, ColumnConfig)>) -> TableConfig {
    columns
        .into_iter()
        .fold(TableConfig::new(), |table, (name, column)| {
            table.with_column(name, column)
        })
}

pub fn schema(tables: Vec<(&str, TableConfig)>) -> SchemaConfig {
    tables
        .into_iter()
        .fold(SchemaConfig::new(), |schema, (name, table)| {
            schema.with_table(name, table)
        })
}

pub fn database(schemas: Vec<(&str, SchemaConfig)>) -> Configuration {
    schemas
        .into_iter()
        .fold(Configuration::new(), |config, (name, schema)| {
            config.with_schema(name, schema)
        })
}

/// Table names of `config` as `schema.table`, in iteration order.
pub fn qualified_tables(config: &Configuration) -> Vec<String> {
    config
        .schemas
        .iter()
        .flat_map(|(schema, s)| s.tables.keys().map(move |table| format!("{schema}.{table}")))
        .collect()
}

/// Asserts that every table of `expected` exists in `actual` with the
/// same columns, compared on type, length bound and nullability.
pub fn assert_same_columns(actual: &Configuration, expected: &Configuration) {
    for (schema_name, schema) in &expected.schemas {
        for (table_name, table) in &schema.tables {
            let found = actual
                .table(schema_name, table_name)
                .unwrap_or_else(|| panic!("Missing table {schema_name}.{table_name}"));
            let names: Vec<&String> = found.columns.keys().collect();
            let expected_names: Vec<&String> = table.columns.keys().collect();
            let mut sorted = names.clone();
            let mut expected_sorted = expected_names.clone();
            sorted.sort();
            expected_sorted.sort();
            assert_eq!(sorted, expected_sorted, "Columns of {schema_name}.{table_name}");

            for (column_name, column) in &table.columns {
                let other = &found.columns[column_name];
                assert_eq!(
                    (
                        &other.data_type,
                        other.nullable,
                        other.character_maximum_length
                    ),
                    (
                        &column.data_type,
                        column.nullable,
                        column.character_maximum_length
                    ),
                    "Column {schema_name}.{table_name}.{column_name}"
                );
            }
        }
    }
}
