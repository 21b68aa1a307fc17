//! Folding of catalog rows into a [`Configuration`].
//!
//! A live-state reader runs three catalog queries (schemas, columns,
//! constraint columns) and hands the rows to [`fold_catalog`]. Keeping
//! the folding here leaves the reader with nothing but I/O, and lets the
//! same rows be replayed from a dump.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::{
    Configuration, ConstraintKind, ConstraintMarker, PrimaryKeyConstraint, SchemaConfig,
};
use crate::error::{DeltaError, Result};
use crate::typemap::map_catalog_column;

/// `information_schema.tables.table_type` of a base table.
pub const BASE_TABLE: &str = "BASE TABLE";

/// Schemas excluded by default.
pub const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema", "pg_toast"];

/// One row of `information_schema.columns` joined with
/// `information_schema.tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    /// Schema name.
    pub table_schema: String,
    /// Table or view name.
    pub table_name: String,
    /// `BASE TABLE`, `VIEW`, ...
    pub table_type: String,
    /// Column name.
    pub column_name: String,
    /// Canonical type name.
    pub data_type: String,
    /// Length bound of character types.
    #[serde(default)]
    pub character_maximum_length: Option<i32>,
    /// `YES` or `NO`.
    pub is_nullable: String,
}

/// One constrained column of a `pg_constraint` row, in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConstraint {
    /// Constraint name.
    pub name: String,
    /// `contype` code.
    #[serde(rename = "type")]
    pub constraint_type: String,
    /// Schema of the constrained table.
    pub schema: String,
    /// Constrained table.
    pub table: String,
    /// Constrained column.
    pub column: String,
}

/// Raw rows read from a database catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Schema names in catalog order.
    #[serde(default)]
    pub schemas: Vec<String>,
    /// Column rows in catalog order.
    #[serde(default)]
    pub columns: Vec<CatalogColumn>,
    /// Constraint rows in catalog order.
    #[serde(default)]
    pub constraints: Vec<CatalogConstraint>,
}

/// Options for folding catalog rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Schemas left out of the configuration.
    pub exclude_schemas: Vec<String>,
    /// Skip columns of unsupported types instead of failing.
    pub skip_unsupported: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            exclude_schemas: SYSTEM_SCHEMAS.iter().map(ToString::to_string).collect(),
            skip_unsupported: false,
        }
    }
}

impl CatalogOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips unsupported columns instead of failing.
    #[must_use]
    pub const fn skip_unsupported(mut self) -> Self {
        self.skip_unsupported = true;
        self
    }

    /// Excludes one more schema.
    #[must_use]
    pub fn exclude_schema(mut self, name: impl Into<String>) -> Self {
        self.exclude_schemas.push(name.into());
        self
    }

    /// Returns `true` if the schema is left out. Per-session temporary
    /// schemas are always left out.
    #[must_use]
    pub fn is_excluded(&self, schema: &str) -> bool {
        schema.starts_with("pg_temp_")
            || schema.starts_with("pg_toast_temp_")
            || self.exclude_schemas.iter().any(|excluded| excluded == schema)
    }
}

/// Folds catalog rows into a configuration.
///
/// Schemas keep catalog order, empty ones included. Base tables land in
/// `tables`, everything else in `views`. Constraint rows become markers
/// on their column; primary key rows also build the table's explicit
/// primary key, columns in key order.
pub fn fold_catalog(catalog: &Catalog, options: &CatalogOptions) -> Result<Configuration> {
    let mut configuration = Configuration::new();

    for schema in &catalog.schemas {
        if options.is_excluded(schema) {
            continue;
        }
        configuration
            .schemas
            .entry(schema.clone())
            .or_insert_with(SchemaConfig::new);
    }

    for row in &catalog.columns {
        if options.is_excluded(&row.table_schema) {
            continue;
        }
        let column = match map_catalog_column(
            &row.data_type,
            row.character_maximum_length,
            &row.is_nullable,
        ) {
            Ok(column) => column,
            Err(err @ DeltaError::UnsupportedType { .. }) if options.skip_unsupported => {
                warn!(
                    schema = %row.table_schema,
                    table = %row.table_name,
                    column = %row.column_name,
                    "skipping column: {err}"
                );
                continue;
            }
            Err(err) => return Err(err),
        };

        let schema = configuration
            .schemas
            .entry(row.table_schema.clone())
            .or_insert_with(SchemaConfig::new);
        let relations = if row.table_type == BASE_TABLE {
            &mut schema.tables
        } else {
            &mut schema.views
        };
        relations
            .entry(row.table_name.clone())
            .or_default()
            .columns
            .insert(row.column_name.clone(), column);
    }

    for row in &catalog.constraints {
        if options.is_excluded(&row.schema) {
            continue;
        }
        let Some(kind) = ConstraintKind::from_code(&row.constraint_type) else {
            warn!(
                constraint = %row.name,
                kind = %row.constraint_type,
                "skipping constraint of unknown kind"
            );
            continue;
        };
        apply_constraint_row(&mut configuration, row, kind, options)?;
    }

    Ok(configuration)
}

fn apply_constraint_row(
    configuration: &mut Configuration,
    row: &CatalogConstraint,
    kind: ConstraintKind,
    options: &CatalogOptions,
) -> Result<()> {
    let qualified = format!("{}.{}", row.schema, row.table);
    let table = configuration
        .schemas
        .get_mut(&row.schema)
        .and_then(|schema| schema.tables.get_mut(&row.table));
    let Some(table) = table.filter(|table| table.columns.contains_key(&row.column)) else {
        if options.skip_unsupported {
            warn!(
                constraint = %row.name,
                table = %qualified,
                column = %row.column,
                "skipping constraint on a column that was not loaded"
            );
            return Ok(());
        }
        return Err(DeltaError::malformed(
            qualified,
            format!(
                "constraint '{}' references unknown column '{}'",
                row.name, row.column
            ),
        ));
    };

    if kind == ConstraintKind::PrimaryKey {
        let primary_key = table
            .constraints
            .primary_key
            .get_or_insert_with(|| {
                PrimaryKeyConstraint::new(row.name.clone(), Vec::<String>::new())
            });
        if primary_key.name != row.name {
            return Err(DeltaError::malformed(
                qualified,
                format!(
                    "two primary keys declared ('{}' and '{}')",
                    primary_key.name, row.name
                ),
            ));
        }
        if !primary_key.columns.contains(&row.column) {
            primary_key.columns.push(row.column.clone());
        }
    }

    if let Some(column) = table.columns.get_mut(&row.column) {
        let marker = ConstraintMarker {
            kind,
            name: Some(row.name.clone()),
        };
        if !column.constraints.contains(&marker) {
            column.constraints.push(marker);
        }
    }
    trace!(constraint = %row.name, table = %qualified, column = %row.column, "constraint marker");
    Ok(())
}
