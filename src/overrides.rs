//! Per-column hooks that replace the default filter or sort behavior.
//!
//! By default a searched column becomes `name = value` and an ordered column
//! sorts on its own name. Registering an override for a column name lets the
//! caller expand that into arbitrary field lookups or several sort fields:
//!
//! ```rust
//! use datatable_query::{CustomConditions, CustomOrders};
//!
//! // "03-14" on a `birthday` column filters on month and day separately
//! let conditions = CustomConditions::new().register_fallible("birthday", |value, column| {
//!     let (month, day) = value.split_once('-').ok_or("expected MM-DD")?;
//!     Ok::<_, &str>(vec![
//!         (format!("{column}__month"), month.to_string()),
//!         (format!("{column}__day"), day.to_string()),
//!     ])
//! });
//!
//! // sorting on `author` sorts by last then first name
//! let orders = CustomOrders::new().register("author", || {
//!     vec!["author_last".to_string(), "author_first".to_string()]
//! });
//! # let _ = (conditions, orders);
//! ```
//!
//! An override that is not registered, fails, or yields nothing never surfaces
//! as an error: the default behavior is used instead.

use std::collections::HashMap;
use std::fmt;

/// Expands a searched column into `(field lookup, value)` pairs.
pub trait ConditionOverride {
    /// `None` (or an empty list) means "use the default equality filter".
    fn conditions(&self, column: &str, value: &str) -> Option<Vec<(String, String)>>;
}

/// Expands an ordered column into one or more field names.
pub trait OrderOverride {
    /// `None` (or an empty list) means "sort on the column name".
    fn sort_fields(&self, column: &str) -> Option<Vec<String>>;
}

/// Use the default behavior for every column.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl ConditionOverride for NoOverrides {
    fn conditions(&self, _column: &str, _value: &str) -> Option<Vec<(String, String)>> {
        None
    }
}

impl OrderOverride for NoOverrides {
    fn sort_fields(&self, _column: &str) -> Option<Vec<String>> {
        None
    }
}

type ConditionFn = dyn Fn(&str, &str) -> Result<Vec<(String, String)>, String> + Send + Sync;
type OrderFn = dyn Fn() -> Result<Vec<String>, String> + Send + Sync;

/// Closure-backed [`ConditionOverride`], keyed by column name.
#[derive(Default)]
pub struct CustomConditions {
    hooks: HashMap<String, Box<ConditionFn>>,
}

impl CustomConditions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook called with `(value, column)`.
    #[must_use]
    pub fn register<F>(mut self, column: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&str, &str) -> Vec<(String, String)> + Send + Sync + 'static,
    {
        self.hooks
            .insert(column.into(), Box::new(move |value: &str, column: &str| Ok(hook(value, column))));
        self
    }

    /// Register a hook that may fail. Failures fall back to the default filter.
    #[must_use]
    pub fn register_fallible<F, E>(mut self, column: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&str, &str) -> Result<Vec<(String, String)>, E> + Send + Sync + 'static,
        E: fmt::Display + 'static,
    {
        self.hooks.insert(
            column.into(),
            Box::new(move |value: &str, column: &str| {
                hook(value, column).map_err(|e| e.to_string())
            }),
        );
        self
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.hooks.contains_key(column)
    }
}

impl ConditionOverride for CustomConditions {
    fn conditions(&self, column: &str, value: &str) -> Option<Vec<(String, String)>> {
        let hook = self.hooks.get(column)?;
        match hook(value, column) {
            Ok(pairs) => Some(pairs),
            Err(error) => {
                tracing::debug!(column, %error, "Condition override failed, using default filter");
                None
            }
        }
    }
}

impl fmt::Debug for CustomConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomConditions")
            .field("columns", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Closure-backed [`OrderOverride`], keyed by column name.
#[derive(Default)]
pub struct CustomOrders {
    hooks: HashMap<String, Box<OrderFn>>,
}

impl CustomOrders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register<F>(mut self, column: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.hooks.insert(column.into(), Box::new(move || Ok(hook())));
        self
    }

    /// Register a hook that may fail. Failures fall back to sorting on the column name.
    #[must_use]
    pub fn register_fallible<F, E>(mut self, column: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Result<Vec<String>, E> + Send + Sync + 'static,
        E: fmt::Display + 'static,
    {
        self.hooks
            .insert(column.into(), Box::new(move || hook().map_err(|e| e.to_string())));
        self
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.hooks.contains_key(column)
    }
}

impl OrderOverride for CustomOrders {
    fn sort_fields(&self, column: &str) -> Option<Vec<String>> {
        let hook = self.hooks.get(column)?;
        match hook() {
            Ok(fields) => Some(fields),
            Err(error) => {
                tracing::debug!(column, %error, "Order override failed, using column name");
                None
            }
        }
    }
}

impl fmt::Debug for CustomOrders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomOrders")
            .field("columns", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}
