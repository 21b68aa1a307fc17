//! # pgdelta-core
//!
//! Declarative schema migrations for PostgreSQL.
//!
//! This crate provides:
//! - An ordered configuration model describing schemas, tables and columns
//! - A delta engine comparing a baseline configuration with a desired one
//! - A statement synthesizer rendering the delta as an ordered script
//! - Producer helpers building configurations from raw column definitions
//!   or from catalog rows, through one type mapper
//!
//! ## Computing a migration
//!
//! ```rust
//! use pgdelta_core::config::{Configuration, SchemaConfig, TableConfig};
//! use pgdelta_core::typemap::{bigint, varchar};
//! use pgdelta_core::compute_migration_script;
//!
//! let old = Configuration::new().with_schema(
//!     "app",
//!     SchemaConfig::new().with_table(
//!         "users",
//!         TableConfig::new().with_column("id", bigint().primary_key()),
//!     ),
//! );
//! let new = Configuration::new().with_schema(
//!     "app",
//!     SchemaConfig::new().with_table(
//!         "users",
//!         TableConfig::new()
//!             .with_column("id", bigint().primary_key())
//!             .with_column("email", varchar(Some(32)).not_null()),
//!     ),
//! );
//!
//! let script = compute_migration_script(&old, &new).unwrap();
//! assert_eq!(
//!     script,
//!     "ALTER TABLE app.users \nADD COLUMN email varchar(32) NOT NULL;"
//! );
//!
//! // Nothing to do once both sides agree
//! assert_eq!(compute_migration_script(&new, &new).unwrap(), "");
//! ```
//!
//! Only schema and table creation, column add/alter/drop and primary key
//! changes are produced. Nothing is ever dropped beyond columns and
//! primary keys, and views are never diffed.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod constraint;
pub mod delta;
pub mod dialect;
pub mod error;
pub mod state;
pub mod synth;
pub mod typemap;

pub use builder::{ConfigurationBuilder, RawColumn};
pub use catalog::{Catalog, CatalogOptions, fold_catalog};
pub use config::{
    ColumnConfig, Configuration, ConstraintKind, ConstraintMarker, PrimaryKeyConstraint,
    SchemaConfig, TableConfig, TableConstraints,
};
pub use constraint::PrimaryKeyDelta;
pub use delta::{AlterTable, Delta, NewTable, compute_delta};
pub use dialect::{MigrationDialect, PostgresDialect};
pub use error::{DeltaError, Result};
pub use state::SchemaState;
pub use synth::{compute_migration_script, join_statements, synthesize, synthesize_with};
pub use typemap::{RawConstraint, TypeDescriptor, TypeFamily, map_catalog_column, map_column};
