//! Dialect-specific SQL rendering for deltas.
//!
//! A dialect turns individual delta records into statement text. The
//! order in which statements are emitted is fixed by
//! [`synthesize_with`](crate::synth::synthesize_with), not by the dialect.

mod postgres;

pub use postgres::PostgresDialect;

use crate::config::{ColumnConfig, PrimaryKeyConstraint};
use crate::delta::{AlterTable, NewTable, qualified_name};
use crate::error::{DeltaError, Result};

/// Trait for dialect-specific statement rendering.
pub trait MigrationDialect {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Renders `schema.table`.
    fn table_name(&self, schema: &str, table: &str) -> String {
        qualified_name(schema, table)
    }

    /// Generates SQL for CREATE SCHEMA.
    fn create_schema(&self, name: &str) -> String {
        format!("CREATE SCHEMA {name}")
    }

    /// Generates SQL for CREATE TABLE.
    ///
    /// `inline_primary_key` names the column rendered with an inline
    /// `PRIMARY KEY`, if any.
    fn create_table(&self, table: &NewTable, inline_primary_key: Option<&str>) -> Result<String> {
        let name = table.qualified_name();
        let columns = table
            .column_definitions
            .iter()
            .map(|(column_name, column)| {
                let inline = inline_primary_key == Some(column_name.as_str());
                self.column_definition(&name, column_name, column, inline)
            })
            .collect::<Result<Vec<_>>>()?;

        let table_name = self.table_name(&table.schema_name, &table.table_name);
        if columns.is_empty() {
            return Ok(format!("CREATE TABLE {table_name} ()"));
        }
        Ok(format!(
            "CREATE TABLE {table_name} (\n\t{}\n)",
            columns.join(",\n\t")
        ))
    }

    /// Generates a column definition: `<name> <type>[ NOT NULL]`, or
    /// `<name> <type> PRIMARY KEY` when the key is inlined.
    fn column_definition(
        &self,
        table: &str,
        name: &str,
        column: &ColumnConfig,
        primary_key: bool,
    ) -> Result<String> {
        let mut sql = format!("{name} {}", type_statement(table, name, column)?);
        if primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        Ok(sql)
    }

    /// Generates one ALTER TABLE adding every new column, or `None` if
    /// there is none.
    fn add_columns(&self, table: &AlterTable) -> Result<Option<String>> {
        let name = table.qualified_name();
        let clauses = table
            .new_column_definitions
            .iter()
            .map(|(column_name, column)| {
                self.column_definition(&name, column_name, column, false)
                    .map(|definition| format!("ADD COLUMN {definition}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.alter_table(table, &clauses))
    }

    /// Generates one ALTER TABLE changing every altered column, or `None`
    /// if there is none.
    fn alter_columns(&self, table: &AlterTable) -> Result<Option<String>> {
        let name = table.qualified_name();
        let clauses = table
            .alter_column_definitions
            .iter()
            .map(|(column_name, column)| self.alter_column(&name, column_name, column))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.alter_table(table, &clauses))
    }

    /// Generates the clauses bringing one column to its desired type and
    /// nullability.
    fn alter_column(&self, table: &str, name: &str, column: &ColumnConfig) -> Result<String>;

    /// Generates one ALTER TABLE dropping every deleted column, or `None`
    /// if there is none.
    fn drop_columns(&self, table: &AlterTable) -> Option<String> {
        let clauses: Vec<String> = table
            .delete_column_definitions
            .keys()
            .map(|column_name| format!("DROP COLUMN {column_name}"))
            .collect();
        self.alter_table(table, &clauses)
    }

    /// Joins clauses into `ALTER TABLE <table> \n<clause>,\n<clause>`.
    fn alter_table(&self, table: &AlterTable, clauses: &[String]) -> Option<String> {
        if clauses.is_empty() {
            return None;
        }
        Some(format!(
            "ALTER TABLE {} \n{}",
            self.table_name(&table.schema_name, &table.table_name),
            clauses.join(",\n")
        ))
    }

    /// Generates SQL adding a primary key.
    fn add_primary_key(
        &self,
        schema: &str,
        table: &str,
        primary_key: &PrimaryKeyConstraint,
    ) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY({})",
            self.table_name(schema, table),
            primary_key.name,
            primary_key.columns.join(",")
        )
    }

    /// Generates SQL dropping a named constraint.
    fn drop_constraint(&self, schema: &str, table: &str, name: &str) -> String;
}

/// Returns the column's type statement, which every rendered column
/// must carry.
pub(crate) fn type_statement<'a>(
    table: &str,
    name: &str,
    column: &'a ColumnConfig,
) -> Result<&'a str> {
    column
        .data_type_stmt
        .as_deref()
        .ok_or_else(|| DeltaError::MissingTypeStatement {
            table: table.to_string(),
            column: name.to_string(),
        })
}
