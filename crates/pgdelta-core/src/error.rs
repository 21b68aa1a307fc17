//! Error types for delta computation and statement synthesis.

use crate::typemap::TypeDescriptor;

/// Errors that can occur while building configurations, computing a
/// delta, or rendering it as SQL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeltaError {
    /// A column type does not belong to any supported type family.
    #[error("Unsupported column type: {descriptor}")]
    UnsupportedType {
        /// The raw type as the producer saw it.
        descriptor: TypeDescriptor,
    },

    /// A primary key is missing its name or columns, or contradicts the
    /// columns it is declared on.
    #[error("Malformed constraint on table '{table}': {message}")]
    MalformedConstraint {
        /// Table carrying the constraint.
        table: String,
        /// What is wrong with it.
        message: String,
    },

    /// A column reached the synthesizer without a type statement.
    #[error("Column '{table}.{column}' has no data type statement")]
    MissingTypeStatement {
        /// Qualified table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A delta or builder call does not fit the configuration it targets.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl DeltaError {
    pub(crate) fn malformed(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedConstraint {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Result type for delta operations.
pub type Result<T> = std::result::Result<T, DeltaError>;
