use serde::Serialize;

/// One extracted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Records matching the applied filters, across all pages.
    pub total: u64,
    /// Records in this page.
    pub page_size: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: u64) -> Self {
        let page_size = items.len() as u64;
        Self {
            items,
            total,
            page_size,
        }
    }

    /// Convert every item, e.g. from a database model into an API struct.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page_size: self.page_size,
        }
    }
}

/// The JSON body DataTables expects from a server-side endpoint.
///
/// ```json
/// {"draw": "3", "recordsTotal": 57, "recordsFiltered": 57, "data": [...]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTablesResponse<T> {
    pub draw: String,
    pub records_total: u64,
    pub records_filtered: u64,
    pub data: Vec<T>,
}

impl<T> DataTablesResponse<T> {
    /// Both record counts report the filtered total of the page.
    #[must_use]
    pub fn from_page(draw: impl Into<String>, page: Page<T>) -> Self {
        Self {
            draw: draw.into(),
            records_total: page.total,
            records_filtered: page.total,
            data: page.items,
        }
    }

    /// For callers that count the unfiltered table separately.
    #[must_use]
    pub const fn with_records_total(mut self, records_total: u64) -> Self {
        self.records_total = records_total;
        self
    }
}
