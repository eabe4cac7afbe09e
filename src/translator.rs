use crate::config::TranslatorConfig;
use crate::errors::DataTablesError;
use crate::filter::{Criteria, resolve_filters_with};
use crate::overrides::{ConditionOverride, NoOverrides, OrderOverride};
use crate::params::{RawParameters, RequestModel, normalize};
use crate::queryable::Queryable;
use crate::response::Page;
use crate::sort::{SortKey, resolve_order};

/// Turns one DataTables request into a filtered, ordered and paginated query.
///
/// The translator only keeps the raw parameters. Every operation normalizes them
/// again, so no state carries over between calls.
///
/// ```rust,ignore
/// let translator = ParamTranslator::new(RawParameters::from_query(uri.query().unwrap_or("")));
/// let query = translator.apply(SeaQuery::<book::Entity>::new(db), &conditions, &orders, Criteria::new())?;
/// let page = translator.extract_page(&query).await?;
/// Json(DataTablesResponse::from_page(translator.draw()?, page))
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParamTranslator {
    raw: RawParameters,
    config: TranslatorConfig,
}

impl ParamTranslator {
    #[must_use]
    pub fn new(raw: RawParameters) -> Self {
        Self::with_config(raw, TranslatorConfig::default())
    }

    #[must_use]
    pub const fn with_config(raw: RawParameters, config: TranslatorConfig) -> Self {
        Self { raw, config }
    }

    #[must_use]
    pub const fn raw(&self) -> &RawParameters {
        &self.raw
    }

    #[must_use]
    pub const fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// The normalized request, with `length` clamped by the configuration.
    ///
    /// # Errors
    ///
    /// Any protocol violation found by [`normalize`].
    pub fn request(&self) -> Result<RequestModel, DataTablesError> {
        let mut model = normalize(&self.raw)?;
        model.length = self.config.clamp_length(model.length);
        Ok(model)
    }

    /// The draw token to echo back.
    ///
    /// # Errors
    ///
    /// Any protocol violation found by [`normalize`].
    pub fn draw(&self) -> Result<String, DataTablesError> {
        Ok(self.request()?.draw)
    }

    /// # Errors
    ///
    /// Any protocol violation found by [`normalize`].
    pub fn start(&self) -> Result<u64, DataTablesError> {
        Ok(self.request()?.start)
    }

    /// # Errors
    ///
    /// Any protocol violation found by [`normalize`].
    pub fn length(&self) -> Result<u64, DataTablesError> {
        Ok(self.request()?.length)
    }

    /// Exclusive end of the requested page.
    ///
    /// # Errors
    ///
    /// Any protocol violation found by [`normalize`].
    pub fn end(&self) -> Result<u64, DataTablesError> {
        Ok(self.request()?.end())
    }

    /// Sort keys using only the default per-column ordering.
    ///
    /// # Errors
    ///
    /// A protocol violation, or an order rule pointing past the last column.
    pub fn orders(&self) -> Result<Vec<SortKey>, DataTablesError> {
        let model = self.request()?;
        resolve_order(&model.columns, &model.order, &NoOverrides)
    }

    /// Column-derived filters, without any base filters.
    ///
    /// # Errors
    ///
    /// Any protocol violation found by [`normalize`], or a search value longer
    /// than the configured limit.
    pub fn filters(
        &self,
        conditions: &(impl ConditionOverride + ?Sized),
    ) -> Result<Criteria, DataTablesError> {
        let model = self.request()?;
        resolve_filters_with(&model.columns, conditions, &self.config)
    }

    /// Per-column search mode: order by the resolved sort keys, then filter by
    /// `base` overlaid with the column-derived filters.
    ///
    /// # Errors
    ///
    /// A protocol violation, an oversize search value, or an order rule
    /// pointing past the last column.
    pub fn apply<Q: Queryable>(
        &self,
        query: Q,
        conditions: &(impl ConditionOverride + ?Sized),
        orders: &(impl OrderOverride + ?Sized),
        base: Criteria,
    ) -> Result<Q, DataTablesError> {
        let model = self.request()?;

        let mut filters = base;
        filters.merge(resolve_filters_with(&model.columns, conditions, &self.config)?);
        let order_by = resolve_order(&model.columns, &model.order, orders)?;

        tracing::debug!(
            draw = %model.draw,
            filters = ?filters,
            order_by = ?order_by.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Applying column search"
        );

        Ok(query.order_by(&order_by).filter(&filters))
    }

    /// Global search mode: per-column search values are ignored. The query is
    /// ordered, filtered by `base`, then narrowed by `global(search[value])`
    /// when a global builder is given and the search value is not empty.
    ///
    /// # Errors
    ///
    /// A protocol violation, or an order rule pointing past the last column.
    pub fn apply_global<Q, F>(
        &self,
        query: Q,
        orders: &(impl OrderOverride + ?Sized),
        base: Criteria,
        global: Option<F>,
    ) -> Result<Q, DataTablesError>
    where
        Q: Queryable,
        F: FnOnce(&str) -> Q::Predicate,
    {
        let model = self.request()?;
        let order_by = resolve_order(&model.columns, &model.order, orders)?;

        let mut query = query.order_by(&order_by).filter(&base);

        let term = self.config.clamp_search(&model.search.value);
        if let Some(global) = global
            && !term.is_empty()
        {
            tracing::debug!(draw = %model.draw, term, "Applying global search");
            query = query.filter_predicate(global(term));
        }

        Ok(query)
    }

    /// Drop records matching `criteria`. Composable after [`apply`](Self::apply).
    #[must_use]
    pub fn exclude<Q: Queryable>(&self, query: Q, criteria: &Criteria) -> Q {
        query.exclude(criteria)
    }

    /// The requested page of an already narrowed query.
    ///
    /// `total` is the number of records matching the query and `page_size` the
    /// number of records in the returned page. A page past the end is empty.
    ///
    /// # Errors
    ///
    /// A protocol violation, or a backend failure while counting or slicing.
    pub async fn extract_page<Q: Queryable>(&self, query: &Q) -> Result<Page<Q::Item>, DataTablesError> {
        let model = self.request()?;
        let items = query.slice(model.start, model.end()).await?;
        let total = query.count().await?;
        Ok(Page::new(items, total))
    }

    /// Every record of an already narrowed query plus its count.
    ///
    /// # Errors
    ///
    /// A backend failure while counting or materializing.
    pub async fn extract_full<Q: Queryable>(&self, query: &Q) -> Result<(Vec<Q::Item>, u64), DataTablesError> {
        let items = query.all().await?;
        let total = query.count().await?;
        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryQuery;
    use crate::overrides::{CustomConditions, CustomOrders};
    use serde_json::{Value, json};

    fn raw(pairs: &[(&str, &str)]) -> RawParameters {
        let mut raw: RawParameters = [
            ("draw", "7"),
            ("start", "0"),
            ("length", "10"),
            ("search[value]", ""),
            ("search[regex]", "false"),
        ]
        .into_iter()
        .collect();
        for (k, v) in pairs {
            raw.insert(*k, *v);
        }
        raw
    }

    fn with_columns(names: &[(&str, &str)], extra: &[(&str, &str)]) -> RawParameters {
        let mut raw = raw(extra);
        for (i, (name, search)) in names.iter().enumerate() {
            raw.insert(format!("columns[{i}][data]"), *name);
            raw.insert(format!("columns[{i}][name]"), *name);
            raw.insert(format!("columns[{i}][searchable]"), "true");
            raw.insert(format!("columns[{i}][orderable]"), "true");
            raw.insert(format!("columns[{i}][search][value]"), *search);
            raw.insert(format!("columns[{i}][search][regex]"), "false");
        }
        raw
    }

    fn tickets() -> MemoryQuery<Value> {
        MemoryQuery::new(vec![
            json!({"title": "crash on save", "status": "open", "owner": "ana"}),
            json!({"title": "slow search", "status": "closed", "owner": null}),
            json!({"title": "typo", "status": "open", "owner": "bo"}),
            json!({"title": "foo bar", "status": "waiting", "owner": "ana"}),
        ])
    }

    fn titles(rows: &[Value]) -> Vec<&str> {
        rows.iter().map(|r| r["title"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_order_without_filters() {
        let translator = ParamTranslator::new(with_columns(
            &[("title", ""), ("status", "")],
            &[("order[0][column]", "1"), ("order[0][dir]", "desc")],
        ));
        assert!(translator.filters(&NoOverrides).unwrap().is_empty());
        assert_eq!(translator.orders().unwrap(), [SortKey::parse("-status")]);

        let query = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap();
        let page = translator.extract_page(&query).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.page_size, 4);
        assert_eq!(page.items[0]["status"], "waiting");
        assert_eq!(page.items[3]["status"], "closed");
    }

    #[tokio::test]
    async fn test_column_search_filters() {
        let translator = ParamTranslator::new(with_columns(&[("title", "foo bar"), ("status", "")], &[]));
        assert_eq!(
            translator.filters(&NoOverrides).unwrap(),
            Criteria::new().with("title", "foo bar")
        );
        let query = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap();
        let page = translator.extract_page(&query).await.unwrap();
        assert_eq!(titles(&page.items), ["foo bar"]);
    }

    #[tokio::test]
    async fn test_null_search_matches_missing_owner() {
        let translator = ParamTranslator::new(with_columns(&[("owner", "null")], &[]));
        let query = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap();
        assert_eq!(titles(&translator.extract_page(&query).await.unwrap().items), ["slow search"]);
    }

    #[tokio::test]
    async fn test_base_filters_are_overridden_by_columns() {
        let translator = ParamTranslator::new(with_columns(&[("status", "open")], &[]));
        let base = Criteria::new().with("status", "closed").with("owner", "ana");
        let query = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, base)
            .unwrap();
        assert_eq!(titles(&query.all().await.unwrap()), ["crash on save"]);
    }

    #[tokio::test]
    async fn test_custom_condition_and_order() {
        let conditions = CustomConditions::new().register("title", |value, _| {
            vec![("title__icontains".to_string(), value.to_string())]
        });
        let orders = CustomOrders::new().register("who", || vec!["owner".to_string(), "title".to_string()]);
        let translator = ParamTranslator::new(with_columns(
            &[("title", "S"), ("who", "")],
            &[("order[0][column]", "1"), ("order[0][dir]", "asc")],
        ));

        let query = translator
            .apply(tickets(), &conditions, &orders, Criteria::new())
            .unwrap();
        assert_eq!(titles(&query.all().await.unwrap()), ["slow search", "crash on save"]);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty_with_total() {
        let translator = ParamTranslator::new(with_columns(
            &[("status", "open")],
            &[("start", "10"), ("length", "5")],
        ));
        let query = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap();
        let page = translator.extract_page(&query).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
        assert_eq!(page.page_size, 0);
    }

    #[tokio::test]
    async fn test_pagination_window() {
        let translator = ParamTranslator::new(with_columns(
            &[("title", "")],
            &[
                ("start", "1"),
                ("length", "2"),
                ("order[0][column]", "0"),
                ("order[0][dir]", "asc"),
            ],
        ));
        assert_eq!(translator.end().unwrap(), 3);
        let query = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap();
        let page = translator.extract_page(&query).await.unwrap();
        assert_eq!(titles(&page.items), ["foo bar", "slow search"]);
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_max_length_clamps_page() {
        let config = TranslatorConfig::default().with_max_length(1);
        let translator = ParamTranslator::with_config(with_columns(&[("title", "")], &[]), config);
        assert_eq!(translator.length().unwrap(), 1);
        let query = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap();
        assert_eq!(translator.extract_page(&query).await.unwrap().page_size, 1);
    }

    #[tokio::test]
    async fn test_global_search_ignores_column_search() {
        let translator = ParamTranslator::new(with_columns(
            &[("title", "typo"), ("owner", "")],
            &[("search[value]", "ANA")],
        ));
        let query = translator
            .apply_global(
                tickets(),
                &NoOverrides,
                Criteria::new(),
                Some(|term: &str| MemoryQuery::<Value>::contains_any(&["title", "owner"], term)),
            )
            .unwrap();
        let (items, total) = translator.extract_full(&query).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(titles(&items), ["crash on save", "foo bar"]);
    }

    #[tokio::test]
    async fn test_global_search_skipped_when_empty() {
        let translator = ParamTranslator::new(with_columns(&[("title", "typo")], &[]));
        let query = translator
            .apply_global(
                tickets(),
                &NoOverrides,
                Criteria::new().with("status", "open"),
                Some(|_: &str| -> crate::memory::MemoryPredicate {
                    panic!("global search must not run for an empty term")
                }),
            )
            .unwrap();
        assert_eq!(query.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_exclude_after_apply() {
        let translator = ParamTranslator::new(with_columns(&[("status", "open")], &[]));
        let query = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap();
        let query = translator.exclude(query, &Criteria::new().with("owner", "bo"));
        let (items, total) = translator.extract_full(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(titles(&items), ["crash on save"]);
    }

    #[test]
    fn test_out_of_range_order_is_fatal() {
        let translator = ParamTranslator::new(with_columns(
            &[("title", "")],
            &[("order[0][column]", "5"), ("order[0][dir]", "asc")],
        ));
        let err = translator
            .apply(tickets(), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap_err();
        assert!(err.is_protocol_violation());
        assert!(matches!(err, DataTablesError::OrderColumnOutOfRange { index: 5, .. }));
    }

    #[tokio::test]
    async fn test_long_search_never_matches_its_prefix() {
        let stored = "a".repeat(10_000);
        let searched = "a".repeat(10_001);
        let records = vec![json!({"title": stored})];

        let translator = ParamTranslator::new(with_columns(&[("title", searched.as_str())], &[]));
        let err = translator
            .apply(MemoryQuery::new(records.clone()), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap_err();
        assert!(matches!(err, DataTablesError::SearchTooLong { limit: 10_000, .. }));
        assert!(err.is_protocol_violation());

        let config = TranslatorConfig::default().with_max_search_length(20_000);
        let translator = ParamTranslator::with_config(with_columns(&[("title", searched.as_str())], &[]), config);
        let query = translator
            .apply(MemoryQuery::new(records), &NoOverrides, &NoOverrides, Criteria::new())
            .unwrap();
        assert_eq!(query.count().await.unwrap(), 0);
    }

    #[test]
    fn test_getters() {
        let translator = ParamTranslator::new(raw(&[("start", "20"), ("length", "5")]));
        assert_eq!(translator.draw().unwrap(), "7");
        assert_eq!(translator.start().unwrap(), 20);
        assert_eq!(translator.length().unwrap(), 5);
        assert_eq!(translator.end().unwrap(), 25);
    }
}
