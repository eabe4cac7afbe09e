/// Default upper bound for a search value, in bytes.
pub const MAX_SEARCH_LENGTH: usize = 10_000;

/// Literal search value that is translated into a null filter.
pub const DEFAULT_NULL_LITERAL: &str = "null";

/// Tuning knobs for a [`ParamTranslator`](crate::ParamTranslator).
///
/// ```rust
/// use datatable_query::TranslatorConfig;
///
/// let config = TranslatorConfig::default()
///     .with_max_length(100)
///     .with_null_literal("NULL");
/// assert_eq!(config.max_length, Some(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Search value that means "field is null" instead of a literal match.
    pub null_literal: String,
    /// Caps the page size a client can request. `None` trusts the client.
    pub max_length: Option<u64>,
    /// Column search values longer than this are rejected; the global search
    /// term is truncated to it.
    pub max_search_length: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            null_literal: DEFAULT_NULL_LITERAL.to_string(),
            max_length: None,
            max_search_length: MAX_SEARCH_LENGTH,
        }
    }
}

impl TranslatorConfig {
    #[must_use]
    pub fn with_null_literal(mut self, literal: impl Into<String>) -> Self {
        self.null_literal = literal.into();
        self
    }

    #[must_use]
    pub const fn with_max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub const fn with_max_search_length(mut self, max_search_length: usize) -> Self {
        self.max_search_length = max_search_length;
        self
    }

    /// Truncate the global search term to `max_search_length`, respecting char boundaries.
    #[must_use]
    pub fn clamp_search<'a>(&self, value: &'a str) -> &'a str {
        if value.len() <= self.max_search_length {
            return value;
        }
        let mut end = self.max_search_length;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        &value[..end]
    }

    /// Apply `max_length` to a requested page size.
    #[must_use]
    pub fn clamp_length(&self, length: u64) -> u64 {
        self.max_length.map_or(length, |max| length.min(max))
    }
}
