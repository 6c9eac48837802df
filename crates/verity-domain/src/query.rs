//! Validated search queries
//!
//! Input is validated locally, before any network call is made. An
//! out-of-range query never reaches the extractor.

use std::fmt;

/// Minimum accepted query length in characters, after trimming
pub const MIN_QUERY_CHARS: usize = 3;

/// Maximum accepted query length in characters, after trimming
pub const MAX_QUERY_CHARS: usize = 1000;

/// Why a raw query was rejected before dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRejection {
    /// Nothing left after trimming
    Empty,
    /// Fewer than [`MIN_QUERY_CHARS`] characters
    TooShort(usize),
    /// More than [`MAX_QUERY_CHARS`] characters
    TooLong(usize),
}

impl fmt::Display for QueryRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryRejection::Empty => write!(f, "Please enter a search query"),
            QueryRejection::TooShort(_) => write!(
                f,
                "Search query must be at least {} characters",
                MIN_QUERY_CHARS
            ),
            QueryRejection::TooLong(_) => write!(
                f,
                "Search query must be {} characters or fewer",
                MAX_QUERY_CHARS
            ),
        }
    }
}

impl std::error::Error for QueryRejection {}

/// A user query that passed local validation
///
/// Construction is the only gate: holding a `SearchQuery` means the text is
/// trimmed, non-empty, and within the accepted length bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Validate raw user input into a dispatchable query
    pub fn parse(raw: &str) -> Result<Self, QueryRejection> {
        let trimmed = raw.trim();
        let chars = trimmed.chars().count();

        if chars == 0 {
            return Err(QueryRejection::Empty);
        }
        if chars < MIN_QUERY_CHARS {
            return Err(QueryRejection::TooShort(chars));
        }
        if chars > MAX_QUERY_CHARS {
            return Err(QueryRejection::TooLong(chars));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The validated query text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper, returning the owned text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
