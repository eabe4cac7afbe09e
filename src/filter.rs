use std::collections::BTreeMap;

use crate::config::TranslatorConfig;
use crate::errors::DataTablesError;
use crate::overrides::ConditionOverride;
use crate::params::ColumnDescriptor;

/// Separator between a field name and its lookup, as in `price__gte`.
pub const LOOKUP_SEPARATOR: &str = "__";

/// Comparison applied by a criteria key.
///
/// A bare field name is an exact match; a known suffix after `__` selects
/// another comparison. Unknown suffixes are kept as part of the field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Exact,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    IsNull,
    /// Comma separated list of accepted values
    In,
}

impl Lookup {
    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "exact" => Self::Exact,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "contains" => Self::Contains,
            "icontains" => Self::IContains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "isnull" => Self::IsNull,
            "in" => Self::In,
            _ => return None,
        })
    }
}

/// Split a criteria key into its field name and lookup.
///
/// ```rust
/// use datatable_query::filter::{Lookup, parse_lookup};
///
/// assert_eq!(parse_lookup("price__gte"), ("price", Lookup::Gte));
/// assert_eq!(parse_lookup("title"), ("title", Lookup::Exact));
/// assert_eq!(parse_lookup("created__month"), ("created__month", Lookup::Exact));
/// ```
#[must_use]
pub fn parse_lookup(key: &str) -> (&str, Lookup) {
    key.rsplit_once(LOOKUP_SEPARATOR)
        .and_then(|(field, suffix)| {
            if field.is_empty() {
                return None;
            }
            Lookup::from_suffix(suffix).map(|lookup| (field, lookup))
        })
        .unwrap_or((key, Lookup::Exact))
}

/// Truthiness of an `__isnull` value.
#[must_use]
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Field lookups to narrow a query with, `None` meaning a null value.
///
/// Keys are unique; inserting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria(BTreeMap<String, Option<String>>);

impl Criteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a non-null value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    /// Builder-style insert of a null value.
    #[must_use]
    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value);
    }

    /// Overlay `other` on top of `self`; keys present in both take `other`'s value.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(Option::as_deref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl IntoIterator for Criteria {
    type Item = (String, Option<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn nullable(value: &str, null_literal: &str) -> Option<String> {
    (value != null_literal).then(|| value.to_string())
}

/// Filters for every column with a non-empty search value, default configuration.
///
/// # Errors
///
/// See [`resolve_filters_with`].
pub fn resolve_filters(
    columns: &[ColumnDescriptor],
    overrides: &(impl ConditionOverride + ?Sized),
) -> Result<Criteria, DataTablesError> {
    resolve_filters_with(columns, overrides, &TranslatorConfig::default())
}

/// Filters for every column with a non-empty search value.
///
/// A column whose override yields pairs contributes those pairs; any other
/// column becomes `name = value`. The configured null literal becomes `None`.
/// Values reach filters and overrides unmodified.
///
/// # Errors
///
/// [`DataTablesError::SearchTooLong`] when a search value is longer than
/// `max_search_length`.
pub fn resolve_filters_with(
    columns: &[ColumnDescriptor],
    overrides: &(impl ConditionOverride + ?Sized),
    config: &TranslatorConfig,
) -> Result<Criteria, DataTablesError> {
    let mut criteria = Criteria::new();

    for column in columns.iter().filter(|c| !c.search.is_empty()) {
        let value = column.search.value.as_str();
        if value.len() > config.max_search_length {
            return Err(DataTablesError::SearchTooLong {
                column: column.name.clone(),
                limit: config.max_search_length,
            });
        }

        match overrides.conditions(&column.name, value) {
            Some(pairs) if !pairs.is_empty() => {
                for (key, val) in pairs {
                    let val = nullable(&val, &config.null_literal);
                    criteria.insert(key, val);
                }
            }
            _ => {
                tracing::debug!(column = %column.name, "No condition override, filtering on equality");
                criteria.insert(column.name.clone(), nullable(value, &config.null_literal));
            }
        }
    }

    Ok(criteria)
}
