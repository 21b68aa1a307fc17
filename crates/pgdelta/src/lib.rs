//! Declarative PostgreSQL schema migrations.
//!
//! `pgdelta` compares a desired configuration with a baseline (a JSON
//! file, a live database, or nothing) and prints the statements that
//! bring the baseline to the desired state. The engine lives in
//! [`pgdelta_core`]; this crate adds configuration files and the live
//! catalog reader.
//!
//! # CLI Usage
//!
//! ```bash
//! # Script against a live database
//! pgdelta script --desired schema.json --database-url postgres://localhost/app
//!
//! # Script against a saved snapshot
//! pgdelta snapshot --database-url postgres://localhost/app > live.json
//! pgdelta script --desired schema.json --baseline live.json --output migration.sql
//!
//! # Inspect the delta itself
//! pgdelta delta --desired schema.json --baseline live.json
//! ```

pub mod error;
pub mod introspect;
pub mod source;

pub use error::{PgDeltaError, Result};
pub use introspect::PostgresIntrospector;
pub use source::{Baseline, load_configuration, write_output};
