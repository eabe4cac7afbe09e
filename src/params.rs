//! Parsing of the flat DataTables parameter set.
//!
//! DataTables sends its server-side state as index-keyed form fields:
//!
//! ```text
//! draw=3&start=0&length=10&search[value]=&search[regex]=false
//! columns[0][data]=title&columns[0][name]=title&columns[0][searchable]=true
//! columns[0][orderable]=true&columns[0][search][value]=&columns[0][search][regex]=false
//! order[0][column]=0&order[0][dir]=asc
//! ```
//!
//! [`normalize`] turns that into a [`RequestModel`]. Columns and order rules are
//! scanned from index 0 upwards and the scan stops at the first missing index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::DataTablesError;
use crate::sort::SortDirection;

/// The raw key/value pairs exactly as the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RawParameters(HashMap<String, String>);

impl RawParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored. For repeated keys the last value wins.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, key: &str) -> Result<&str, DataTablesError> {
        self.get(key)
            .ok_or_else(|| DataTablesError::missing_key(key))
    }

    fn require_u64(&self, key: &str) -> Result<u64, DataTablesError> {
        let value = self.require(key)?;
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| DataTablesError::invalid_integer(key, value))
    }
}

impl From<HashMap<String, String>> for RawParameters {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A search term and its (uninterpreted) regex flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchDescriptor {
    pub value: String,
    pub regex: bool,
}

impl SearchDescriptor {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// One UI column. Its position in [`RequestModel::columns`] is what order rules refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub data: String,
    pub name: String,
    pub searchable: bool,
    pub orderable: bool,
    pub search: SearchDescriptor,
}

/// One sort rule: a column index and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderDescriptor {
    pub column: usize,
    pub dir: SortDirection,
}

/// Structured form of a DataTables request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestModel {
    pub draw: String,
    pub start: u64,
    pub length: u64,
    pub search: SearchDescriptor,
    pub columns: Vec<ColumnDescriptor>,
    pub order: Vec<OrderDescriptor>,
}

impl RequestModel {
    /// Exclusive end of the requested page, `start + length`.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn column_key(index: usize, field: &str) -> String {
    format!("columns[{index}][{field}]")
}

fn parse_column(raw: &RawParameters, index: usize, name: &str) -> Result<ColumnDescriptor, DataTablesError> {
    let field = |field: &str| raw.require(&column_key(index, field)).map(str::to_string);

    Ok(ColumnDescriptor {
        data: field("data")?,
        name: name.to_string(),
        searchable: parse_flag(&field("searchable")?),
        orderable: parse_flag(&field("orderable")?),
        search: SearchDescriptor {
            value: field("search][value")?,
            regex: parse_flag(&field("search][regex")?),
        },
    })
}

fn parse_order(raw: &RawParameters, index: usize, column: &str) -> Result<OrderDescriptor, DataTablesError> {
    let column_key = format!("order[{index}][column]");
    let column = column
        .trim()
        .parse::<usize>()
        .map_err(|_| DataTablesError::invalid_integer(&column_key, column))?;

    let dir_key = format!("order[{index}][dir]");
    let dir_value = raw.require(&dir_key)?;
    let dir = SortDirection::parse(dir_value)
        .ok_or_else(|| DataTablesError::invalid_direction(&dir_key, dir_value))?;

    Ok(OrderDescriptor { column, dir })
}

/// Build a fresh [`RequestModel`] from raw parameters.
///
/// `columns[i][name]` and `order[i][column]` mark index `i` as present; the scan
/// stops at the first index where that marker is missing, so sparse indices are
/// silently truncated. Any other missing key is a protocol violation.
///
/// # Errors
///
/// - [`DataTablesError::MissingKey`] when a scalar key (`draw`, `start`, `length`,
///   `search[value]`, `search[regex]`) or a sub-key of a present index is absent.
/// - [`DataTablesError::InvalidInteger`] when `start`, `length` or an order column
///   is not a non-negative integer.
/// - [`DataTablesError::InvalidDirection`] for an order direction other than `asc`/`desc`.
pub fn normalize(raw: &RawParameters) -> Result<RequestModel, DataTablesError> {
    let mut columns = Vec::new();
    while let Some(name) = raw.get(&column_key(columns.len(), "name")) {
        let column = parse_column(raw, columns.len(), name)?;
        columns.push(column);
    }

    let mut order = Vec::new();
    while let Some(column) = raw.get(&format!("order[{}][column]", order.len())) {
        let rule = parse_order(raw, order.len(), column)?;
        order.push(rule);
    }

    let model = RequestModel {
        draw: raw.require("draw")?.to_string(),
        start: raw.require_u64("start")?,
        length: raw.require_u64("length")?,
        search: SearchDescriptor {
            value: raw.require("search[value]")?.to_string(),
            regex: parse_flag(raw.require("search[regex]")?),
        },
        columns,
        order,
    };

    tracing::debug!(
        draw = %model.draw,
        columns = model.columns.len(),
        orders = model.order.len(),
        start = model.start,
        length = model.length,
        "Normalized table request"
    );

    Ok(model)
}
