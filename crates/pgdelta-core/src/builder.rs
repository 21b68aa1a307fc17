//! Configuration building from raw column definitions.
//!
//! This is the statement-ingestion side: a caller that has parsed
//! `CREATE SCHEMA` and `CREATE TABLE` statements feeds their pieces here
//! and gets back a [`Configuration`] that compares equal to what the
//! catalog reports for the same tables.

use crate::config::{Configuration, ConstraintKind, SchemaConfig, TableConfig};
use crate::error::{DeltaError, Result};
use crate::typemap::{RawConstraint, TypeDescriptor, map_column};

/// A column as written in a `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub type_name: TypeDescriptor,
    /// Column-level constraints, in declaration order.
    pub constraints: Vec<RawConstraint>,
}

impl RawColumn {
    /// Creates a column without constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            type_name,
            constraints: Vec::new(),
        }
    }

    /// Adds a constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: RawConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Builds a configuration one schema and table at a time.
///
/// ```
/// use pgdelta_core::builder::{ConfigurationBuilder, RawColumn};
/// use pgdelta_core::typemap::{RawConstraint, TypeDescriptor};
///
/// let mut builder = ConfigurationBuilder::new();
/// builder.schema("app");
/// builder
///     .table(
///         "app",
///         "users",
///         [RawColumn::new("id", TypeDescriptor::new(["pg_catalog", "int8"]))
///             .with_constraint(RawConstraint::PrimaryKey { name: None })],
///     )
///     .unwrap();
///
/// let config = builder.build();
/// let users = config.table("app", "users").unwrap();
/// assert_eq!(users.constraints.primary_key.as_ref().unwrap().name, "users_pkey");
/// ```
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    configuration: Configuration,
}

impl ConfigurationBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a schema. Declaring it again is a no-op.
    pub fn schema(&mut self, name: impl Into<String>) -> &mut Self {
        self.configuration
            .schemas
            .entry(name.into())
            .or_insert_with(SchemaConfig::new);
        self
    }

    /// Declares a table, declaring its schema if needed.
    ///
    /// The table's primary key is derived from the column markers and
    /// stored explicitly; every key column's marker carries the final
    /// constraint name.
    pub fn table(
        &mut self,
        schema: &str,
        table: &str,
        columns: impl IntoIterator<Item = RawColumn>,
    ) -> Result<&mut Self> {
        let mut config = TableConfig::new();
        for raw in columns {
            if config.columns.contains_key(&raw.name) {
                return Err(DeltaError::InvalidState(format!(
                    "Column '{}' declared twice in table '{schema}.{table}'",
                    raw.name
                )));
            }
            let column = map_column(&raw.type_name, &raw.constraints)?;
            config.columns.insert(raw.name, column);
        }

        if let Some(primary_key) = config.primary_key(table)? {
            for column_name in &primary_key.columns {
                if let Some(column) = config.columns.get_mut(column_name) {
                    for marker in &mut column.constraints {
                        if marker.kind == ConstraintKind::PrimaryKey {
                            marker.name = Some(primary_key.name.clone());
                        }
                    }
                }
            }
            config.constraints.primary_key = Some(primary_key);
        }

        let schema_config = self
            .configuration
            .schemas
            .entry(schema.to_string())
            .or_insert_with(SchemaConfig::new);
        if schema_config.tables.contains_key(table) {
            return Err(DeltaError::InvalidState(format!(
                "Table '{schema}.{table}' declared twice"
            )));
        }
        schema_config.tables.insert(table.to_string(), config);
        Ok(self)
    }

    /// Returns the configuration built so far.
    #[must_use]
    pub fn build(self) -> Configuration {
        self.configuration
    }
}
