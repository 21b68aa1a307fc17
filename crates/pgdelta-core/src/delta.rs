//! Delta engine.
//!
//! Compares a baseline [`Configuration`] (the live database) with a
//! desired one and classifies every schema, table and column as new,
//! altered or deleted. The resulting [`Delta`] follows the desired
//! configuration's iteration order, which is the order statements are
//! later emitted in.
//!
//! Schemas and tables missing from the desired configuration are never
//! reported: there is no schema or table drop support.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{ColumnConfig, Configuration, TableConfig};
use crate::constraint::{PrimaryKeyDelta, compare_table_constraints};
use crate::error::Result;

/// Structured difference between a baseline and a desired configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Schema-level changes.
    #[serde(rename = "schema")]
    pub schemas: SchemaDelta,
    /// Table-level changes.
    pub tables: TableDeltas,
}

impl Delta {
    /// Returns `true` if nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.new.is_empty() && self.tables.new.is_empty() && self.tables.alter.is_empty()
    }
}

/// Schemas to create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDelta {
    /// Schema names present in desired but not in baseline.
    pub new: Vec<String>,
}

/// Tables to create or alter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDeltas {
    /// Tables present in desired but not in baseline.
    pub new: Vec<NewTable>,
    /// Tables present in both with at least one change.
    pub alter: Vec<AlterTable>,
}

/// A table to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTable {
    /// Schema the table belongs to.
    pub schema_name: String,
    /// Table name.
    pub table_name: String,
    /// Every column, in declaration order.
    pub column_definitions: IndexMap<String, ColumnConfig>,
    /// Primary key to create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<PrimaryKeyDelta>,
}

impl NewTable {
    /// `schema.table`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.schema_name, &self.table_name)
    }
}

/// Changes to an existing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterTable {
    /// Schema the table belongs to.
    pub schema_name: String,
    /// Table name.
    pub table_name: String,
    /// Columns to add.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub new_column_definitions: IndexMap<String, ColumnConfig>,
    /// Columns whose definition changed, in their desired form.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub alter_column_definitions: IndexMap<String, ColumnConfig>,
    /// Columns to remove, in their baseline form.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub delete_column_definitions: IndexMap<String, ColumnConfig>,
    /// Primary key changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<PrimaryKeyDelta>,
}

impl AlterTable {
    /// `schema.table`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.schema_name, &self.table_name)
    }

    /// Returns `true` if any column or constraint changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.new_column_definitions.is_empty()
            || !self.alter_column_definitions.is_empty()
            || !self.delete_column_definitions.is_empty()
            || self.constraints.is_some()
    }
}

pub(crate) fn qualified_name(schema: &str, table: &str) -> String {
    format!("{schema}.{table}")
}

/// Two column definitions are equivalent if their type, length bound,
/// nullability and type statement match. Constraint markers are not
/// compared. A missing type statement on either side never matches.
#[must_use]
pub fn columns_equivalent(a: &ColumnConfig, b: &ColumnConfig) -> bool {
    let statements_match = matches!(
        (&a.data_type_stmt, &b.data_type_stmt),
        (Some(a_stmt), Some(b_stmt)) if a_stmt == b_stmt
    );
    statements_match
        && a.data_type == b.data_type
        && a.character_maximum_length == b.character_maximum_length
        && a.nullable == b.nullable
}

/// Builds the creation record for a table absent from the baseline.
fn diff_new_table(schema_name: &str, table_name: &str, table: &TableConfig) -> Result<NewTable> {
    let constraints = compare_table_constraints(table_name, None, table)?;
    Ok(NewTable {
        schema_name: schema_name.to_string(),
        table_name: table_name.to_string(),
        column_definitions: table.columns.clone(),
        constraints,
    })
}

/// Splits the columns of a table present on both sides into added,
/// altered and deleted sets and compares its primary keys.
fn diff_table(
    schema_name: &str,
    table_name: &str,
    old: &TableConfig,
    new: &TableConfig,
) -> Result<AlterTable> {
    let mut new_columns = IndexMap::new();
    let mut alter_columns = IndexMap::new();
    for (name, column) in &new.columns {
        match old.columns.get(name) {
            None => {
                trace!(table = table_name, column = %name, "new column");
                new_columns.insert(name.clone(), column.clone());
            }
            Some(existing) if !columns_equivalent(existing, column) => {
                trace!(table = table_name, column = %name, "altered column");
                alter_columns.insert(name.clone(), column.clone());
            }
            Some(_) => {}
        }
    }

    let delete_columns: IndexMap<String, ColumnConfig> = old
        .columns
        .iter()
        .filter(|(name, _)| !new.columns.contains_key(*name))
        .map(|(name, column)| (name.clone(), column.clone()))
        .collect();

    let constraints = compare_table_constraints(table_name, Some(old), new)?;

    Ok(AlterTable {
        schema_name: schema_name.to_string(),
        table_name: table_name.to_string(),
        new_column_definitions: new_columns,
        alter_column_definitions: alter_columns,
        delete_column_definitions: delete_columns,
        constraints,
    })
}

/// Computes the changes that turn `old` into `new`.
///
/// Neither input is modified. Output order follows `new`: schemas in
/// declaration order, then each schema's tables in declaration order.
///
/// Fails if either side declares a malformed primary key for a table
/// that is compared.
pub fn compute_delta(old: &Configuration, new: &Configuration) -> Result<Delta> {
    let mut delta = Delta::default();

    for schema_name in new.schemas.keys() {
        if !old.schemas.contains_key(schema_name) {
            debug!(schema = %schema_name, "new schema");
            delta.schemas.new.push(schema_name.clone());
        }
    }

    for (schema_name, schema) in &new.schemas {
        for (table_name, table) in &schema.tables {
            match old.table(schema_name, table_name) {
                None => {
                    debug!(schema = %schema_name, table = %table_name, "new table");
                    delta
                        .tables
                        .new
                        .push(diff_new_table(schema_name, table_name, table)?);
                }
                Some(existing) => {
                    let altered = diff_table(schema_name, table_name, existing, table)?;
                    if altered.has_changes() {
                        debug!(
                            schema = %schema_name,
                            table = %table_name,
                            added = altered.new_column_definitions.len(),
                            altered = altered.alter_column_definitions.len(),
                            deleted = altered.delete_column_definitions.len(),
                            constraints = altered.constraints.is_some(),
                            "altered table"
                        );
                        delta.tables.alter.push(altered);
                    } else {
                        trace!(schema = %schema_name, table = %table_name, "unchanged table");
                    }
                }
            }
        }
    }

    Ok(delta)
}
