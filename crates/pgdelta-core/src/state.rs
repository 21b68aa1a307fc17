//! Configuration reconstruction from deltas.
//!
//! Replaying a delta onto the configuration it was computed from yields a
//! configuration equivalent to the desired one. This is what a database
//! would look like after running the synthesized script, and is used to
//! check that a delta is complete.

use crate::config::{Configuration, ConstraintKind, SchemaConfig, TableConfig};
use crate::constraint::PrimaryKeyDelta;
use crate::delta::{AlterTable, Delta, NewTable};
use crate::error::{DeltaError, Result};

/// Reconstructs a configuration by replaying deltas.
#[derive(Debug, Default)]
pub struct SchemaState {
    configuration: Configuration,
}

impl SchemaState {
    /// Starts from the given configuration.
    #[must_use]
    pub const fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }

    /// Returns the current configuration.
    #[must_use]
    pub const fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Consumes and returns the configuration.
    #[must_use]
    pub fn into_configuration(self) -> Configuration {
        self.configuration
    }

    /// Applies a delta: new schemas, then new tables, then table
    /// alterations.
    pub fn apply_delta(&mut self, delta: &Delta) -> Result<()> {
        for schema in &delta.schemas.new {
            if self.configuration.schemas.contains_key(schema) {
                return Err(DeltaError::InvalidState(format!(
                    "Schema '{schema}' already exists"
                )));
            }
            self.configuration
                .schemas
                .insert(schema.clone(), SchemaConfig::new());
        }
        for table in &delta.tables.new {
            self.create_table(table)?;
        }
        for table in &delta.tables.alter {
            self.alter_table(table)?;
        }
        Ok(())
    }

    fn create_table(&mut self, table: &NewTable) -> Result<()> {
        let schema = self
            .configuration
            .schemas
            .get_mut(&table.schema_name)
            .ok_or_else(|| {
                DeltaError::InvalidState(format!(
                    "Schema '{}' does not exist",
                    table.schema_name
                ))
            })?;
        if schema.tables.contains_key(&table.table_name) {
            return Err(DeltaError::InvalidState(format!(
                "Table '{}' already exists",
                table.qualified_name()
            )));
        }

        let mut created = TableConfig {
            columns: table.column_definitions.clone(),
            ..TableConfig::default()
        };
        if let Some(constraints) = &table.constraints {
            apply_constraints(
                &table.table_name,
                &table.qualified_name(),
                &mut created,
                constraints,
            )?;
        }
        schema.tables.insert(table.table_name.clone(), created);
        Ok(())
    }

    fn alter_table(&mut self, table: &AlterTable) -> Result<()> {
        let name = table.qualified_name();
        let target = self
            .configuration
            .schemas
            .get_mut(&table.schema_name)
            .and_then(|schema| schema.tables.get_mut(&table.table_name))
            .ok_or_else(|| DeltaError::InvalidState(format!("Table '{name}' does not exist")))?;

        for (column_name, column) in &table.new_column_definitions {
            if target.columns.contains_key(column_name) {
                return Err(DeltaError::InvalidState(format!(
                    "Column '{column_name}' already exists in table '{name}'"
                )));
            }
            target.columns.insert(column_name.clone(), column.clone());
        }

        for (column_name, column) in &table.alter_column_definitions {
            let existing = target.columns.get_mut(column_name).ok_or_else(|| {
                DeltaError::InvalidState(format!(
                    "Column '{column_name}' does not exist in table '{name}'"
                ))
            })?;
            *existing = column.clone();
        }

        for column_name in table.delete_column_definitions.keys() {
            if target.columns.shift_remove(column_name).is_none() {
                return Err(DeltaError::InvalidState(format!(
                    "Column '{column_name}' does not exist in table '{name}'"
                )));
            }
        }

        if let Some(constraints) = &table.constraints {
            apply_constraints(&table.table_name, &name, target, constraints)?;
        }
        Ok(())
    }
}

/// Applies a primary key change to a table's explicit constraints.
fn apply_constraints(
    table_name: &str,
    name: &str,
    table: &mut TableConfig,
    delta: &PrimaryKeyDelta,
) -> Result<()> {
    if let Some(drop_pk) = &delta.drop_pk {
        let current = table.primary_key(table_name)?;
        if current.as_ref().map(|pk| pk.name.as_str()) != Some(drop_pk.name.as_str()) {
            return Err(DeltaError::InvalidState(format!(
                "Primary key '{}' does not exist on table '{name}'",
                drop_pk.name
            )));
        }
        table.constraints.primary_key = None;
        for column in table.columns.values_mut() {
            column
                .constraints
                .retain(|marker| marker.kind != ConstraintKind::PrimaryKey);
        }
    }
    if let Some(new_pk) = &delta.new_pk {
        for column in &new_pk.columns {
            if !table.columns.contains_key(column) {
                return Err(DeltaError::InvalidState(format!(
                    "Primary key '{}' references missing column '{column}' on table '{name}'",
                    new_pk.name
                )));
            }
        }
        table.constraints.primary_key = Some(new_pk.clone());
    }
    Ok(())
}

/// Replays a delta onto `old` and returns the resulting configuration.
pub fn apply_delta(old: &Configuration, delta: &Delta) -> Result<Configuration> {
    let mut state = SchemaState::new(old.clone());
    state.apply_delta(delta)?;
    Ok(state.into_configuration())
}
