//! Statement synthesis.
//!
//! Turns a [`Delta`] into an ordered list of statements:
//!
//! 1. `CREATE SCHEMA` for each new schema;
//! 2. `CREATE TABLE` for each new table, each followed by its primary key;
//! 3. for each altered table: constraint drops, then added, altered and
//!    dropped columns (one statement per category), then constraint
//!    creations.
//!
//! Constraints are dropped before the columns they reference change and
//! created once the columns are final.

use tracing::debug;

use crate::config::{Configuration, PrimaryKeyConstraint};
use crate::constraint::PrimaryKeyDelta;
use crate::delta::{Delta, NewTable, compute_delta};
use crate::dialect::{MigrationDialect, PostgresDialect};
use crate::error::Result;

/// Terminates every statement of a script.
pub const STATEMENT_TERMINATOR: &str = ";";

/// Separates consecutive statements of a script.
pub const STATEMENT_SEPARATOR: &str = "\n\n";

/// Constraint statements for one table, split by when they must run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintStatements {
    /// Run before any column statement of the table.
    pub drop: Vec<String>,
    /// Run after every column statement of the table.
    pub create: Vec<String>,
}

/// Renders a table's primary key changes.
pub fn constraint_statements(
    dialect: &impl MigrationDialect,
    schema: &str,
    table: &str,
    delta: &PrimaryKeyDelta,
) -> ConstraintStatements {
    let mut statements = ConstraintStatements::default();
    if let Some(drop_pk) = &delta.drop_pk {
        statements
            .drop
            .push(dialect.drop_constraint(schema, table, &drop_pk.name));
    }
    if let Some(new_pk) = &delta.new_pk {
        statements
            .create
            .push(dialect.add_primary_key(schema, table, new_pk));
    }
    statements
}

/// Returns the column whose primary key can be declared inline in
/// `CREATE TABLE`.
///
/// Only a single-column key carrying the name Postgres would give it
/// anyway (`<table>_pkey`) is inlined; any other key is added by name
/// after the table exists.
#[must_use]
pub fn inline_primary_key(table: &NewTable) -> Option<&str> {
    let new_pk = table.constraints.as_ref()?.new_pk.as_ref()?;
    match new_pk.columns.as_slice() {
        [column] if new_pk.name == PrimaryKeyConstraint::default_name(&table.table_name) => {
            Some(column.as_str())
        }
        _ => None,
    }
}

/// Renders a delta as ordered statements using the given dialect.
///
/// Statements carry no terminator; see [`join_statements`].
pub fn synthesize_with(delta: &Delta, dialect: &impl MigrationDialect) -> Result<Vec<String>> {
    let mut statements = Vec::new();

    for schema in &delta.schemas.new {
        statements.push(dialect.create_schema(schema));
    }

    for table in &delta.tables.new {
        let inline = inline_primary_key(table);
        statements.push(dialect.create_table(table, inline)?);
        if inline.is_none() {
            if let Some(constraints) = &table.constraints {
                let rendered = constraint_statements(
                    dialect,
                    &table.schema_name,
                    &table.table_name,
                    constraints,
                );
                statements.extend(rendered.create);
            }
        }
        debug!(table = %table.qualified_name(), inline_key = inline.is_some(), "create table");
    }

    for table in &delta.tables.alter {
        let constraints = table
            .constraints
            .as_ref()
            .map(|c| constraint_statements(dialect, &table.schema_name, &table.table_name, c))
            .unwrap_or_default();
        let before = statements.len();

        statements.extend(constraints.drop);
        statements.extend(dialect.add_columns(table)?);
        statements.extend(dialect.alter_columns(table)?);
        statements.extend(dialect.drop_columns(table));
        statements.extend(constraints.create);

        debug!(
            table = %table.qualified_name(),
            statements = statements.len() - before,
            "alter table"
        );
    }

    debug!(dialect = dialect.name(), statements = statements.len(), "synthesized delta");
    Ok(statements)
}

/// Renders a delta as ordered PostgreSQL statements.
pub fn synthesize(delta: &Delta) -> Result<Vec<String>> {
    synthesize_with(delta, &PostgresDialect::new())
}

/// Joins statements into a script: `;\n\n` between statements and a
/// final `;`. No statements yield an empty script.
#[must_use]
pub fn join_statements(statements: &[String]) -> String {
    if statements.is_empty() {
        return String::new();
    }
    let mut script =
        statements.join(&format!("{STATEMENT_TERMINATOR}{STATEMENT_SEPARATOR}"));
    script.push_str(STATEMENT_TERMINATOR);
    script
}

/// Computes the delta between two configurations and renders it as a
/// PostgreSQL script. Returns an empty string when nothing changes.
pub fn compute_migration_script(old: &Configuration, new: &Configuration) -> Result<String> {
    let delta = compute_delta(old, new)?;
    let statements = synthesize(&delta)?;
    Ok(join_statements(&statements))
}
