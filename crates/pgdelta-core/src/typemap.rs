//! Column type mapping.
//!
//! Both configuration producers, statement ingestion and live catalog
//! introspection, resolve their raw column types through this module so
//! that two configurations built from different sources compare equal
//! when they describe the same column.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ColumnConfig, ConstraintMarker};
use crate::error::{DeltaError, Result};

const PG_CATALOG: &str = "pg_catalog";

/// A raw column type as a producer sees it: a possibly qualified type
/// name plus integer modifiers.
///
/// Statement ingestion yields descriptors such as
/// `pg_catalog.varchar(32)`; the catalog yields `character varying` with
/// the length reported separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Name parts, optionally prefixed by the `pg_catalog` qualifier.
    pub names: Vec<String>,
    /// Type modifiers such as a maximum length.
    #[serde(default)]
    pub modifiers: Vec<i64>,
}

impl TypeDescriptor {
    /// Creates a descriptor without modifiers.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            modifiers: Vec::new(),
        }
    }

    /// Sets the type modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: impl IntoIterator<Item = i64>) -> Self {
        self.modifiers = modifiers.into_iter().collect();
        self
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names.join("."))?;
        if !self.modifiers.is_empty() {
            let modifiers: Vec<String> = self.modifiers.iter().map(ToString::to_string).collect();
            write!(f, "({})", modifiers.join(","))?;
        }
        Ok(())
    }
}

/// The supported type families, in canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// 64-bit integer.
    Bigint,
    /// Variable-length character string with an optional length bound.
    Varchar(Option<u32>),
    /// UUID.
    Uuid,
}

impl TypeFamily {
    /// Resolves a raw descriptor to its family.
    ///
    /// Fails with [`DeltaError::UnsupportedType`] for anything outside the
    /// known families, including a known name with modifiers it does not
    /// take.
    pub fn resolve(descriptor: &TypeDescriptor) -> Result<Self> {
        let unsupported = || DeltaError::UnsupportedType {
            descriptor: descriptor.clone(),
        };

        let base = match descriptor.names.as_slice() {
            [name] => name,
            [qualifier, name] if qualifier.eq_ignore_ascii_case(PG_CATALOG) => name,
            _ => return Err(unsupported()),
        };

        match (
            base.to_ascii_lowercase().as_str(),
            descriptor.modifiers.as_slice(),
        ) {
            ("int8" | "bigint", []) => Ok(Self::Bigint),
            ("uuid", []) => Ok(Self::Uuid),
            ("varchar" | "character varying", []) => Ok(Self::Varchar(None)),
            ("varchar" | "character varying", [length]) => u32::try_from(*length)
                .ok()
                .filter(|length| *length > 0)
                .map(|length| Self::Varchar(Some(length)))
                .ok_or_else(unsupported),
            _ => Err(unsupported()),
        }
    }

    /// Canonical type name, as `information_schema.columns.data_type`
    /// reports it.
    #[must_use]
    pub const fn data_type(&self) -> &'static str {
        match self {
            Self::Bigint => "bigint",
            Self::Varchar(_) => "character varying",
            Self::Uuid => "uuid",
        }
    }

    /// Type fragment used when rendering statements.
    #[must_use]
    pub fn data_type_stmt(&self) -> String {
        match self {
            Self::Bigint => "bigint".to_string(),
            Self::Varchar(Some(length)) => format!("varchar({length})"),
            Self::Varchar(None) => "varchar".to_string(),
            Self::Uuid => "uuid".to_string(),
        }
    }

    /// Length bound; `None` for fixed-width types.
    #[must_use]
    pub const fn character_maximum_length(&self) -> Option<u32> {
        match self {
            Self::Varchar(length) => *length,
            Self::Bigint | Self::Uuid => None,
        }
    }
}

/// Column-level constraint markers attached to a raw column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawConstraint {
    /// `NOT NULL`
    NotNull,
    /// An explicit `NULL`.
    Null,
    /// `PRIMARY KEY`, optionally named.
    PrimaryKey {
        /// Constraint name given in the definition.
        name: Option<String>,
    },
    /// Any other constraint; carried by producers but ignored here.
    Other(String),
}

/// Maps a raw column definition to its canonical configuration.
///
/// Columns are nullable unless a `NOT NULL` or `PRIMARY KEY` marker is
/// present; an explicit `NULL` never overrides either.
pub fn map_column(
    descriptor: &TypeDescriptor,
    constraints: &[RawConstraint],
) -> Result<ColumnConfig> {
    let family = TypeFamily::resolve(descriptor)?;
    let mut column = ColumnConfig::of(&family);
    for constraint in constraints {
        match constraint {
            RawConstraint::NotNull => column.nullable = false,
            RawConstraint::PrimaryKey { name } => {
                column.nullable = false;
                column
                    .constraints
                    .push(ConstraintMarker::primary_key(name.clone()));
            }
            RawConstraint::Null | RawConstraint::Other(_) => {}
        }
    }
    Ok(column)
}

/// Maps an `information_schema.columns` row to its canonical
/// configuration.
pub fn map_catalog_column(
    data_type: &str,
    character_maximum_length: Option<i32>,
    is_nullable: &str,
) -> Result<ColumnConfig> {
    let descriptor = TypeDescriptor::new([data_type])
        .with_modifiers(character_maximum_length.map(i64::from));
    let family = TypeFamily::resolve(&descriptor)?;
    let mut column = ColumnConfig::of(&family);
    column.nullable = is_nullable.eq_ignore_ascii_case("YES");
    Ok(column)
}

/// A nullable `bigint` column.
#[must_use]
pub fn bigint() -> ColumnConfig {
    ColumnConfig::of(&TypeFamily::Bigint)
}

/// A nullable `varchar` column, bounded when `length` is given.
#[must_use]
pub fn varchar(length: Option<u32>) -> ColumnConfig {
    ColumnConfig::of(&TypeFamily::Varchar(length))
}

/// A nullable `uuid` column.
#[must_use]
pub fn uuid() -> ColumnConfig {
    ColumnConfig::of(&TypeFamily::Uuid)
}
