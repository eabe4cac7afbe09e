//! # Error Handling for DataTables Requests
//!
//! Two kinds of failure can leave this crate:
//! - **Protocol violations**: the client sent a parameter set that does not follow
//!   the DataTables server-side protocol (missing `start`, non-numeric `length`,
//!   an order rule pointing past the last column, ...). These map to `400 Bad Request`.
//! - **Backend failures**: the data store failed while counting or slicing. The
//!   details are logged with `tracing` and never sent to the client.
//!
//! Custom filter/order overrides never produce errors. A failing override is
//! logged at debug level and the default behavior is used instead.
//!
//! ```rust,ignore
//! async fn list(Query(raw): Query<RawParameters>) -> Result<Json<DataTablesResponse<Row>>, DataTablesError> {
//!     let translator = ParamTranslator::new(raw);
//!     let query = translator.apply(MemoryQuery::new(rows()), &NoOverrides, &NoOverrides, Criteria::new())?;
//!     let page = translator.extract_page(&query).await?;
//!     Ok(Json(DataTablesResponse::from_page(translator.draw()?, page)))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Errors raised while translating or executing a DataTables request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataTablesError {
    /// A required parameter is absent (`draw`, `start`, `columns[2][data]`, ...)
    MissingKey {
        /// The raw parameter key that was looked up
        key: String,
    },

    /// A parameter that must be a non-negative integer is not one
    InvalidInteger {
        /// The raw parameter key
        key: String,
        /// The offending value
        value: String,
    },

    /// An order direction other than `asc` / `desc`
    InvalidDirection {
        /// The raw parameter key
        key: String,
        /// The offending value
        value: String,
    },

    /// An order rule references a column index that does not exist
    OrderColumnOutOfRange {
        /// Referenced column index
        index: usize,
        /// Number of columns actually sent
        columns: usize,
    },

    /// A column search value is longer than the configured limit
    SearchTooLong {
        /// Column name the value was sent for
        column: String,
        /// Maximum accepted length in bytes
        limit: usize,
    },

    /// A filter or sort key names a field the backend does not have
    UnknownField {
        /// The field name as requested
        field: String,
    },

    /// A filter value cannot be converted to the type of its field
    InvalidFilterValue {
        /// Field being filtered
        field: String,
        /// The offending value
        value: String,
    },

    /// The backing store failed (details logged, not exposed)
    Backend {
        /// Internal error details
        internal: String,
    },
}

impl DataTablesError {
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    pub fn invalid_integer(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidInteger {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn invalid_direction(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidDirection {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField { field: field.into() }
    }

    pub fn invalid_filter_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidFilterValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Wrap any backend error. The underlying error is only kept as text for logging.
    ///
    /// # Example
    /// ```rust,ignore
    /// let rows = select.all(db).await.map_err(DataTablesError::backend)?;
    /// ```
    pub fn backend(err: impl fmt::Display) -> Self {
        Self::Backend {
            internal: err.to_string(),
        }
    }

    /// True for every error caused by malformed client input.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        !matches!(self, Self::Backend { .. })
    }

    fn status_code(&self) -> StatusCode {
        if self.is_protocol_violation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Get the user-facing error message (sanitized)
    fn user_message(&self) -> String {
        match self {
            Self::MissingKey { key } => format!("Missing required parameter '{key}'"),
            Self::InvalidInteger { key, value } => {
                format!("Parameter '{key}' must be a non-negative integer, got '{value}'")
            }
            Self::InvalidDirection { key, value } => {
                format!("Parameter '{key}' must be 'asc' or 'desc', got '{value}'")
            }
            Self::OrderColumnOutOfRange { index, columns } => {
                format!("Order references column {index} but only {columns} columns were sent")
            }
            Self::SearchTooLong { column, limit } => {
                format!("Search value for column '{column}' exceeds {limit} bytes")
            }
            Self::UnknownField { field } => format!("Unknown field '{field}'"),
            Self::InvalidFilterValue { field, value } => {
                format!("Value '{value}' is not valid for field '{field}'")
            }
            Self::Backend { .. } => "A database error occurred".to_string(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Backend { internal } => {
                tracing::error!(error = %internal, "Backend error while serving table data");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "Rejected table request"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for DataTablesError {
    fn into_response(self) -> Response {
        self.log_internal();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl fmt::Display for DataTablesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { internal } => write!(f, "backend error: {internal}"),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for DataTablesError {}

impl From<sea_orm::DbErr> for DataTablesError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::backend(err)
    }
}
