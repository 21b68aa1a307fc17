//! Primary key comparison.
//!
//! The primary key is the only constraint kind with delta support. A key
//! is identified by its name: a renamed key is dropped and recreated,
//! there is no in-place rename.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{PrimaryKeyConstraint, TableConfig};
use crate::error::Result;

/// Primary key changes for one table.
///
/// Both sides are present only when the key's name changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyDelta {
    /// Key to drop before the table's columns change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_pk: Option<PrimaryKeyConstraint>,
    /// Key to create once the table's columns are final.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_pk: Option<PrimaryKeyConstraint>,
}

impl PrimaryKeyDelta {
    /// Returns `true` if neither a drop nor a create is carried.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.drop_pk.is_none() && self.new_pk.is_none()
    }
}

/// Compares two primary keys.
///
/// | old     | new     | result                         |
/// |---------|---------|--------------------------------|
/// | none    | none    | `None`                         |
/// | some    | none    | drop old                       |
/// | none    | some    | create new                     |
/// | some    | some    | drop + create if names differ  |
///
/// Keys with the same name compare equal even if their columns differ.
#[must_use]
pub fn compare_primary_key(
    old: Option<&PrimaryKeyConstraint>,
    new: Option<&PrimaryKeyConstraint>,
) -> Option<PrimaryKeyDelta> {
    match (old, new) {
        (None, None) => None,
        (Some(old), None) => Some(PrimaryKeyDelta {
            drop_pk: Some(old.clone()),
            new_pk: None,
        }),
        (None, Some(new)) => Some(PrimaryKeyDelta {
            drop_pk: None,
            new_pk: Some(new.clone()),
        }),
        (Some(old), Some(new)) if old.name != new.name => Some(PrimaryKeyDelta {
            drop_pk: Some(old.clone()),
            new_pk: Some(new.clone()),
        }),
        (Some(old), Some(new)) => {
            if old.columns != new.columns {
                warn!(
                    constraint = %new.name,
                    old_columns = ?old.columns,
                    new_columns = ?new.columns,
                    "primary key columns changed under an unchanged name; rename the key to rebuild it"
                );
            }
            None
        }
    }
}

/// Compares the primary keys two versions of a table declare. A missing
/// `old` table has no key.
pub fn compare_table_constraints(
    table_name: &str,
    old: Option<&TableConfig>,
    new: &TableConfig,
) -> Result<Option<PrimaryKeyDelta>> {
    let old_pk = match old {
        Some(old) => old.primary_key(table_name)?,
        None => None,
    };
    let new_pk = new.primary_key(table_name)?;
    Ok(compare_primary_key(old_pk.as_ref(), new_pk.as_ref()))
}
