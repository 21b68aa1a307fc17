//! PostgreSQL dialect for migrations.

use super::{MigrationDialect, type_statement};
use crate::config::ColumnConfig;
use crate::error::Result;

/// PostgreSQL dialect for migration SQL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MigrationDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn alter_column(&self, table: &str, name: &str, column: &ColumnConfig) -> Result<String> {
        let data_type = type_statement(table, name, column)?;
        let nullability = if column.nullable {
            "DROP NOT NULL"
        } else {
            "SET NOT NULL"
        };
        Ok(format!(
            "ALTER COLUMN {name} TYPE {data_type},\nALTER COLUMN {name} {nullability}"
        ))
    }

    fn drop_constraint(&self, schema: &str, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {name} CASCADE",
            self.table_name(schema, table)
        )
    }
}
