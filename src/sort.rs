use serde::Serialize;
use std::fmt;

use crate::errors::DataTablesError;
use crate::overrides::OrderOverride;
use crate::params::{ColumnDescriptor, OrderDescriptor};

/// Marker prefixed to a field name for descending order.
pub const DESCENDING_MARKER: char = '-';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a DataTables direction (`asc` / `desc`, case-insensitive)
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Asc => "",
            Self::Desc => "-",
        }
    }
}

impl From<SortDirection> for sea_orm::Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}

/// A field to order by, rendered as `field` or `-field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parse the marker form: `-created` is descending, `created` ascending.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        key.strip_prefix(DESCENDING_MARKER).map_or_else(
            || Self::new(key, SortDirection::Asc),
            |field| Self::new(field, SortDirection::Desc),
        )
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.direction.marker(), self.field)
    }
}

/// Name of the column an order rule points at.
///
/// # Errors
///
/// [`DataTablesError::OrderColumnOutOfRange`] when the index is past the last column.
pub fn order_column<'a>(
    columns: &'a [ColumnDescriptor],
    order: &OrderDescriptor,
) -> Result<&'a str, DataTablesError> {
    columns
        .get(order.column)
        .map(|column| column.name.as_str())
        .ok_or(DataTablesError::OrderColumnOutOfRange {
            index: order.column,
            columns: columns.len(),
        })
}

/// Resolve order rules into sort keys, highest priority first.
///
/// A registered override expands a column into any number of fields which are
/// all appended. Without an override the column itself is appended unless the
/// same key is already present.
///
/// # Errors
///
/// [`DataTablesError::OrderColumnOutOfRange`] if a rule references a missing column.
pub fn resolve_order(
    columns: &[ColumnDescriptor],
    orders: &[OrderDescriptor],
    overrides: &(impl OrderOverride + ?Sized),
) -> Result<Vec<SortKey>, DataTablesError> {
    let mut keys: Vec<SortKey> = Vec::with_capacity(orders.len());

    for order in orders {
        let column = order_column(columns, order)?;

        match overrides.sort_fields(column) {
            Some(fields) if !fields.is_empty() => {
                keys.extend(fields.into_iter().map(|field| SortKey::new(field, order.dir)));
            }
            _ => {
                tracing::debug!(column, "No order override, sorting on column name");
                let key = SortKey::new(column, order.dir);
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
    }

    Ok(keys)
}
