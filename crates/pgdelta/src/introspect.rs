//! Live configuration reader for PostgreSQL.
//!
//! Reads schemas, columns and constrained columns from the catalog and
//! folds them with [`fold_catalog`]. Nothing but these `SELECT`s is ever
//! sent to the server.

use std::time::Duration;

use pgdelta_core::Configuration;
use pgdelta_core::catalog::{
    Catalog, CatalogColumn, CatalogConstraint, CatalogOptions, fold_catalog,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::error::Result;

/// Schemas in name order.
pub const SCHEMAS_SQL: &str = r"
SELECT schema_name::text
FROM information_schema.schemata
ORDER BY schema_name
";

/// Columns of every table and view, in declaration order.
pub const COLUMNS_SQL: &str = r"
SELECT
    c.table_schema::text,
    c.table_name::text,
    t.table_type::text,
    c.column_name::text,
    c.data_type::text,
    c.character_maximum_length::int4,
    c.is_nullable::text
FROM information_schema.columns c
JOIN information_schema.tables t
    ON t.table_schema = c.table_schema
    AND t.table_name = c.table_name
ORDER BY c.table_schema, c.table_name, c.ordinal_position
";

/// Constrained columns of every table constraint, in key order.
pub const CONSTRAINTS_SQL: &str = r"
SELECT
    con.conname::text,
    con.contype::text,
    nsp.nspname::text,
    rel.relname::text,
    att.attname::text
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class rel ON rel.oid = con.conrelid
JOIN pg_catalog.pg_namespace nsp ON nsp.oid = rel.relnamespace
CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
JOIN pg_catalog.pg_attribute att
    ON att.attrelid = rel.oid
    AND att.attnum = k.attnum
ORDER BY nsp.nspname, rel.relname, con.conname, k.ord
";

type ColumnRow = (String, String, String, String, String, Option<i32>, String);
type ConstraintRow = (String, String, String, String, String);

/// Reads the configuration of a live PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PostgresIntrospector {
    pool: PgPool,
}

impl PostgresIntrospector {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `url`, waiting at most `timeout` for a connection.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the catalog queries.
    pub async fn catalog(&self) -> Result<Catalog> {
        let schemas: Vec<(String,)> = sqlx::query_as(SCHEMAS_SQL).fetch_all(&self.pool).await?;
        let columns: Vec<ColumnRow> = sqlx::query_as(COLUMNS_SQL).fetch_all(&self.pool).await?;
        let constraints: Vec<ConstraintRow> =
            sqlx::query_as(CONSTRAINTS_SQL).fetch_all(&self.pool).await?;

        debug!(
            schemas = schemas.len(),
            columns = columns.len(),
            constraints = constraints.len(),
            "read catalog"
        );

        Ok(Catalog {
            schemas: schemas.into_iter().map(|(name,)| name).collect(),
            columns: columns
                .into_iter()
                .map(
                    |(
                        table_schema,
                        table_name,
                        table_type,
                        column_name,
                        data_type,
                        character_maximum_length,
                        is_nullable,
                    )| CatalogColumn {
                        table_schema,
                        table_name,
                        table_type,
                        column_name,
                        data_type,
                        character_maximum_length,
                        is_nullable,
                    },
                )
                .collect(),
            constraints: constraints
                .into_iter()
                .map(|(name, constraint_type, schema, table, column)| CatalogConstraint {
                    name,
                    constraint_type,
                    schema,
                    table,
                    column,
                })
                .collect(),
        })
    }

    /// Reads the live configuration.
    pub async fn introspect(&self, options: &CatalogOptions) -> Result<Configuration> {
        let catalog = self.catalog().await?;
        let configuration = fold_catalog(&catalog, options)?;
        info!(schemas = configuration.schemas.len(), "introspected database");
        Ok(configuration)
    }
}
