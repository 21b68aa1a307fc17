//! Error types for loading configurations and reading live databases.

use std::path::PathBuf;

use pgdelta_core::DeltaError;

/// Errors that can occur while producing or rendering a migration.
#[derive(Debug, thiserror::Error)]
pub enum PgDeltaError {
    /// Delta computation or statement synthesis failed.
    #[error(transparent)]
    Delta(#[from] DeltaError),

    /// Database error while reading the catalog.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A configuration file could not be read or written.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A configuration file is not a valid configuration.
    #[error("Failed to parse configuration file '{path}': {source}")]
    Parse {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// Two configuration files in one directory declare the same table.
    #[error("Table '{schema}.{table}' in '{path}' is already declared by another file")]
    DuplicateTable {
        /// File holding the second declaration.
        path: PathBuf,
        /// Schema name.
        schema: String,
        /// Table or view name.
        table: String,
    },

    /// Writing to standard output failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for pgdelta operations.
pub type Result<T> = std::result::Result<T, PgDeltaError>;
