use async_trait::async_trait;

use crate::errors::DataTablesError;
use crate::filter::Criteria;
use crate::sort::SortKey;

/// A lazy, composable query over some data store.
///
/// Narrowing operations (`filter`, `exclude`, `order_by`, `filter_predicate`)
/// only build up the query. Nothing touches the store until `count`, `slice`
/// or `all` is awaited, and those can be called repeatedly on the same query.
#[async_trait]
pub trait Queryable: Sized + Send + Sync {
    /// A materialized record.
    type Item: Send;

    /// Store-native predicate, used for global search.
    type Predicate: Send;

    /// Keep records matching every criterion.
    #[must_use]
    fn filter(self, criteria: &Criteria) -> Self;

    /// Drop records matching every criterion.
    #[must_use]
    fn exclude(self, criteria: &Criteria) -> Self;

    /// Replace the ordering. The first key has the highest priority.
    #[must_use]
    fn order_by(self, keys: &[SortKey]) -> Self;

    /// Keep records matching a store-native predicate.
    #[must_use]
    fn filter_predicate(self, predicate: Self::Predicate) -> Self;

    /// Number of records the query currently matches.
    async fn count(&self) -> Result<u64, DataTablesError>;

    /// Records in `[start, end)`. A range past the end yields fewer or no records.
    async fn slice(&self, start: u64, end: u64) -> Result<Vec<Self::Item>, DataTablesError>;

    /// Every matching record, ordered.
    async fn all(&self) -> Result<Vec<Self::Item>, DataTablesError>;
}
