//! In-memory [`Queryable`] over any serializable record type.
//!
//! Records are viewed through their `serde_json` representation, so a field is
//! whatever key the record serializes to. Nested fields are reached with `__`
//! (`owner__name`), the same separator used for lookups.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::errors::DataTablesError;
use crate::filter::{Criteria, LOOKUP_SEPARATOR, Lookup, is_truthy, parse_lookup};
use crate::queryable::Queryable;
use crate::sort::{SortDirection, SortKey};

/// Predicate evaluated against the JSON form of a record.
pub type MemoryPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A lazily evaluated query over a vector of records.
#[derive(Clone)]
pub struct MemoryQuery<T> {
    records: Arc<Vec<T>>,
    predicates: Vec<MemoryPredicate>,
    order: Vec<SortKey>,
}

impl<T> MemoryQuery<T> {
    #[must_use]
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records: Arc::new(records),
            predicates: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Sort keys currently applied.
    #[must_use]
    pub fn ordering(&self) -> &[SortKey] {
        &self.order
    }

    /// OR of case-insensitive substring matches over `fields`.
    ///
    /// Suitable as the global-search builder for a memory-backed table.
    #[must_use]
    pub fn contains_any(fields: &[&str], term: &str) -> MemoryPredicate {
        let fields: Vec<String> = fields.iter().map(|f| (*f).to_string()).collect();
        let needle = term.to_lowercase();
        Arc::new(move |record: &Value| {
            fields.iter().any(|field| {
                text(field_value(record, field)).is_some_and(|t| t.to_lowercase().contains(&needle))
            })
        })
    }
}

impl<T> std::fmt::Debug for MemoryQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryQuery")
            .field("records", &self.records.len())
            .field("predicates", &self.predicates.len())
            .field("order", &self.order)
            .finish()
    }
}

static NULL: Value = Value::Null;

fn field_value<'a>(record: &'a Value, path: &str) -> &'a Value {
    path.split(LOOKUP_SEPARATOR)
        .try_fold(record, |value, segment| value.get(segment))
        .unwrap_or(&NULL)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Compare a JSON number against a decimal string. Integers compare exactly;
/// floats only when either side is fractional.
fn compare_number(n: &serde_json::Number, expected: &str) -> Option<Ordering> {
    let expected = expected.trim();
    if let Some(a) = n.as_i64()
        && let Ok(b) = expected.parse::<i64>()
    {
        return Some(a.cmp(&b));
    }
    if let Some(a) = n.as_u64()
        && let Ok(b) = expected.parse::<u64>()
    {
        return Some(a.cmp(&b));
    }
    if n.is_f64() || expected.parse::<i128>().is_err() {
        return n.as_f64()?.partial_cmp(&expected.parse::<f64>().ok()?);
    }
    // integers outside the range i64 and u64 share
    let a = n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))?;
    Some(a.cmp(&expected.parse::<i128>().ok()?))
}

fn value_eq(value: &Value, expected: &str) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => s == expected,
        Value::Bool(b) => expected.trim().eq_ignore_ascii_case(if *b { "true" } else { "false" }),
        Value::Number(n) => compare_number(n, expected).map_or_else(
            || n.to_string() == expected,
            Ordering::is_eq,
        ),
        other => other.to_string() == expected,
    }
}

fn compare_to(value: &Value, expected: &str) -> Option<Ordering> {
    match value {
        Value::Number(n) => compare_number(n, expected),
        Value::String(s) => Some(s.as_str().cmp(expected)),
        Value::Bool(_) => text(value).map(|t| t.as_str().cmp(expected)),
        _ => None,
    }
}

fn matches_lookup(value: &Value, lookup: Lookup, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return match lookup {
            Lookup::Exact | Lookup::IsNull => value.is_null(),
            Lookup::Ne => !value.is_null(),
            _ => false,
        };
    };

    match lookup {
        Lookup::Exact => value_eq(value, expected),
        Lookup::Ne => !value_eq(value, expected),
        Lookup::Gt => compare_to(value, expected) == Some(Ordering::Greater),
        Lookup::Gte => matches!(compare_to(value, expected), Some(Ordering::Greater | Ordering::Equal)),
        Lookup::Lt => compare_to(value, expected) == Some(Ordering::Less),
        Lookup::Lte => matches!(compare_to(value, expected), Some(Ordering::Less | Ordering::Equal)),
        Lookup::Contains => text(value).is_some_and(|t| t.contains(expected)),
        Lookup::IContains => {
            text(value).is_some_and(|t| t.to_lowercase().contains(&expected.to_lowercase()))
        }
        Lookup::StartsWith => text(value).is_some_and(|t| t.starts_with(expected)),
        Lookup::EndsWith => text(value).is_some_and(|t| t.ends_with(expected)),
        Lookup::IsNull => is_truthy(Some(expected)) == value.is_null(),
        Lookup::In => expected.split(',').any(|part| value_eq(value, part.trim())),
    }
}

fn matches_all(record: &Value, criteria: &Criteria) -> bool {
    criteria.iter().all(|(key, expected)| {
        let (field, lookup) = parse_lookup(key);
        matches_lookup(field_value(record, field), lookup, expected)
    })
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Nulls sort first when ascending.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .zip(y.as_f64())
                .and_then(|(x, y)| x.partial_cmp(&y))
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

impl<T> MemoryQuery<T>
where
    T: Serialize + Clone,
{
    /// Filtered and ordered `(json, record)` pairs.
    fn evaluate(&self) -> Result<Vec<(Value, &T)>, DataTablesError> {
        let mut rows = Vec::with_capacity(self.records.len());
        for record in self.records.iter() {
            let json = serde_json::to_value(record).map_err(DataTablesError::backend)?;
            if self.predicates.iter().all(|predicate| predicate(&json)) {
                rows.push((json, record));
            }
        }

        if !self.order.is_empty() {
            rows.sort_by(|(a, _), (b, _)| {
                self.order
                    .iter()
                    .map(|key| {
                        let ordering =
                            compare_values(field_value(a, &key.field), field_value(b, &key.field));
                        match key.direction {
                            SortDirection::Asc => ordering,
                            SortDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        Ok(rows)
    }
}

#[async_trait]
impl<T> Queryable for MemoryQuery<T>
where
    T: Serialize + Clone + Send + Sync,
{
    type Item = T;
    type Predicate = MemoryPredicate;

    fn filter(mut self, criteria: &Criteria) -> Self {
        if !criteria.is_empty() {
            let criteria = criteria.clone();
            self.predicates
                .push(Arc::new(move |record: &Value| matches_all(record, &criteria)));
        }
        self
    }

    fn exclude(mut self, criteria: &Criteria) -> Self {
        if !criteria.is_empty() {
            let criteria = criteria.clone();
            self.predicates
                .push(Arc::new(move |record: &Value| !matches_all(record, &criteria)));
        }
        self
    }

    fn order_by(mut self, keys: &[SortKey]) -> Self {
        self.order = keys.to_vec();
        self
    }

    fn filter_predicate(mut self, predicate: Self::Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    async fn count(&self) -> Result<u64, DataTablesError> {
        Ok(self.evaluate()?.len() as u64)
    }

    async fn slice(&self, start: u64, end: u64) -> Result<Vec<T>, DataTablesError> {
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        let take = usize::try_from(end).unwrap_or(usize::MAX).saturating_sub(start);
        Ok(self
            .evaluate()?
            .into_iter()
            .skip(start)
            .take(take)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn all(&self) -> Result<Vec<T>, DataTablesError> {
        Ok(self
            .evaluate()?
            .into_iter()
            .map(|(_, record)| record.clone())
            .collect())
    }
}
