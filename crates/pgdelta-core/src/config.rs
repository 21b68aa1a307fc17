//! Configuration trees describing a database's structure.
//!
//! A [`Configuration`] maps schema names to [`SchemaConfig`]s, which map
//! table names to [`TableConfig`]s, which map column names to
//! [`ColumnConfig`]s. Every level is an insertion-ordered map: the order
//! in which a producer declares schemas, tables and columns is the order
//! in which statements are emitted for them.
//!
//! The serialized form is the plain nested-object shape:
//!
//! ```json
//! {
//!   "app": {
//!     "tables": {
//!       "users": {
//!         "columns": {
//!           "id": {
//!             "data_type": "bigint",
//!             "data_type_stmt": "bigint",
//!             "nullable": false,
//!             "constraints": [{"type": "p"}]
//!           }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DeltaError, Result};
use crate::typemap::TypeFamily;

/// A database structure at a point in time, keyed by schema name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    /// Schemas in declaration order.
    pub schemas: IndexMap<String, SchemaConfig>,
}

impl Configuration {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no schema is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Looks up a schema by name.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&SchemaConfig> {
        self.schemas.get(name)
    }

    /// Looks up a table by schema and table name.
    #[must_use]
    pub fn table(&self, schema: &str, table: &str) -> Option<&TableConfig> {
        self.schemas.get(schema)?.tables.get(table)
    }

    /// Adds a schema, replacing any previous one with the same name
    /// while keeping its position.
    #[must_use]
    pub fn with_schema(mut self, name: impl Into<String>, schema: SchemaConfig) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }
}

/// Tables and views of one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Base tables in declaration order.
    #[serde(default)]
    pub tables: IndexMap<String, TableConfig>,
    /// Views. Enumerated by producers but never diffed.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub views: IndexMap<String, TableConfig>,
}

impl SchemaConfig {
    /// Creates a schema without tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, table: TableConfig) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Adds a view.
    #[must_use]
    pub fn with_view(mut self, name: impl Into<String>, view: TableConfig) -> Self {
        self.views.insert(name.into(), view);
        self
    }
}

/// Columns and constraints of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: IndexMap<String, ColumnConfig>,
    /// Table-level constraints.
    #[serde(default, skip_serializing_if = "TableConstraints::is_empty")]
    pub constraints: TableConstraints,
}

impl TableConfig {
    /// Creates a table without columns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, column: ColumnConfig) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    /// Sets the explicit primary key.
    #[must_use]
    pub fn with_primary_key(mut self, primary_key: PrimaryKeyConstraint) -> Self {
        self.constraints.primary_key = Some(primary_key);
        self
    }

    /// Returns the primary key this table declares.
    ///
    /// An explicit `constraints.primary_key` wins and is validated.
    /// Otherwise the key is collected from the columns carrying a
    /// primary-key marker, in declaration order; its name is the first
    /// name found on a marker, or `<table>_pkey`.
    pub fn primary_key(&self, table_name: &str) -> Result<Option<PrimaryKeyConstraint>> {
        if let Some(primary_key) = &self.constraints.primary_key {
            self.validate_primary_key(table_name, primary_key)?;
            return Ok(Some(primary_key.clone()));
        }

        let mut name: Option<&str> = None;
        let mut columns: Vec<String> = Vec::new();
        for (column_name, column) in &self.columns {
            for marker in column.primary_key_markers() {
                if let Some(marker_name) = marker.name.as_deref() {
                    match name {
                        None => name = Some(marker_name),
                        Some(existing) if existing != marker_name => {
                            return Err(DeltaError::malformed(
                                table_name,
                                format!(
                                    "primary key markers disagree on the constraint name \
                                     ('{existing}' and '{marker_name}')"
                                ),
                            ));
                        }
                        Some(_) => {}
                    }
                }
                if !columns.contains(column_name) {
                    columns.push(column_name.clone());
                }
            }
        }

        if columns.is_empty() {
            return Ok(None);
        }
        let name = name.map_or_else(
            || PrimaryKeyConstraint::default_name(table_name),
            str::to_string,
        );
        Ok(Some(PrimaryKeyConstraint { name, columns }))
    }

    fn validate_primary_key(
        &self,
        table_name: &str,
        primary_key: &PrimaryKeyConstraint,
    ) -> Result<()> {
        if primary_key.name.is_empty() {
            return Err(DeltaError::malformed(table_name, "primary key has no name"));
        }
        if primary_key.columns.is_empty() {
            return Err(DeltaError::malformed(
                table_name,
                format!("primary key '{}' has no columns", primary_key.name),
            ));
        }
        for (i, column) in primary_key.columns.iter().enumerate() {
            if primary_key.columns[..i].contains(column) {
                return Err(DeltaError::malformed(
                    table_name,
                    format!(
                        "primary key '{}' lists column '{column}' twice",
                        primary_key.name
                    ),
                ));
            }
            if !self.columns.contains_key(column) {
                return Err(DeltaError::malformed(
                    table_name,
                    format!(
                        "primary key '{}' references unknown column '{column}'",
                        primary_key.name
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Table-level constraints. Only the primary key is modeled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConstraints {
    /// The table's primary key, if declared explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKeyConstraint>,
}

impl TableConstraints {
    /// Returns `true` if no constraint is declared.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.primary_key.is_none()
    }
}

/// A named primary key over an ordered list of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimaryKeyConstraint {
    /// Constraint name.
    #[serde(default)]
    pub name: String,
    /// Key columns, in key order.
    #[serde(default)]
    pub columns: Vec<String>,
}

impl PrimaryKeyConstraint {
    /// Creates a primary key.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The name Postgres gives an unnamed primary key on `table`.
    #[must_use]
    pub fn default_name(table: &str) -> String {
        format!("{table}_pkey")
    }
}

/// A single column's canonical definition.
///
/// When `nullable` is absent from the serialized form, a column carrying a
/// primary-key marker deserializes as NOT NULL and any other column as
/// nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnRepr")]
pub struct ColumnConfig {
    /// Canonical type name (`bigint`, `character varying`, `uuid`).
    pub data_type: String,
    /// SQL type fragment used in statements (`varchar(32)`).
    #[serde(default)]
    pub data_type_stmt: Option<String>,
    /// Length bound, only for length-bounded types.
    #[serde(default)]
    pub character_maximum_length: Option<u32>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Constraint markers the column participates in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintMarker>,
}

#[derive(Deserialize)]
struct ColumnRepr {
    data_type: String,
    #[serde(default)]
    data_type_stmt: Option<String>,
    #[serde(default)]
    character_maximum_length: Option<u32>,
    #[serde(default)]
    nullable: Option<bool>,
    #[serde(default)]
    constraints: Vec<ConstraintMarker>,
}

impl From<ColumnRepr> for ColumnConfig {
    fn from(repr: ColumnRepr) -> Self {
        let primary_key = repr
            .constraints
            .iter()
            .any(|marker| marker.kind == ConstraintKind::PrimaryKey);
        Self {
            data_type: repr.data_type,
            data_type_stmt: repr.data_type_stmt,
            character_maximum_length: repr.character_maximum_length,
            nullable: repr.nullable.unwrap_or(!primary_key),
            constraints: repr.constraints,
        }
    }
}

impl ColumnConfig {
    /// Creates a nullable column of the given type family.
    #[must_use]
    pub fn of(family: &TypeFamily) -> Self {
        Self {
            data_type: family.data_type().to_string(),
            data_type_stmt: Some(family.data_type_stmt()),
            character_maximum_length: family.character_maximum_length(),
            nullable: true,
            constraints: Vec::new(),
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds an unnamed primary-key marker. Primary key columns are never
    /// nullable.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.nullable = false;
        self.constraints.push(ConstraintMarker::primary_key(None));
        self
    }

    /// Adds a primary-key marker carrying the constraint name.
    #[must_use]
    pub fn primary_key_named(mut self, name: impl Into<String>) -> Self {
        self.nullable = false;
        self.constraints
            .push(ConstraintMarker::primary_key(Some(name.into())));
        self
    }

    /// Returns `true` if the column carries a primary-key marker.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key_markers().next().is_some()
    }

    fn primary_key_markers(&self) -> impl Iterator<Item = &ConstraintMarker> {
        self.constraints
            .iter()
            .filter(|marker| marker.kind == ConstraintKind::PrimaryKey)
    }
}

/// A column's participation in a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintMarker {
    /// Constraint kind.
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    /// Constraint name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ConstraintMarker {
    /// Creates a primary-key marker.
    #[must_use]
    pub const fn primary_key(name: Option<String>) -> Self {
        Self {
            kind: ConstraintKind::PrimaryKey,
            name,
        }
    }
}

/// Constraint kinds, serialized as Postgres `pg_constraint.contype` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// `c`
    #[serde(rename = "c")]
    Check,
    /// `f`
    #[serde(rename = "f")]
    ForeignKey,
    /// `p`
    #[serde(rename = "p")]
    PrimaryKey,
    /// `u`
    #[serde(rename = "u")]
    Unique,
    /// `t`
    #[serde(rename = "t")]
    Trigger,
    /// `x`
    #[serde(rename = "x")]
    Exclusion,
}

impl ConstraintKind {
    /// Parses a `contype` code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "c" => Some(Self::Check),
            "f" => Some(Self::ForeignKey),
            "p" => Some(Self::PrimaryKey),
            "u" => Some(Self::Unique),
            "t" => Some(Self::Trigger),
            "x" => Some(Self::Exclusion),
            _ => None,
        }
    }

    /// Returns the `contype` code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Check => "c",
            Self::ForeignKey => "f",
            Self::PrimaryKey => "p",
            Self::Unique => "u",
            Self::Trigger => "t",
            Self::Exclusion => "x",
        }
    }
}
