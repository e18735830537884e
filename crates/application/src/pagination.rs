use std::str::FromStr;

use ledgerline_core::{AppError, AppResult};
use ledgerline_domain::PageCursor;
use tracing::warn;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: usize = 20;
/// Largest page size served; larger requests are clamped.
pub const MAX_PAGE_LIMIT: usize = 200;

/// How a malformed cursor token is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidCursorPolicy {
    /// Fail the request with `InvalidCursor`.
    #[default]
    Reject,
    /// Log a warning and serve the first page.
    Ignore,
}

impl InvalidCursorPolicy {
    /// Parses transport value into a policy.
    pub fn parse_transport(value: &str) -> AppResult<Self> {
        match value {
            "reject" => Ok(Self::Reject),
            "ignore" => Ok(Self::Ignore),
            _ => Err(AppError::Validation(format!(
                "unknown invalid cursor policy '{value}'"
            ))),
        }
    }
}

impl FromStr for InvalidCursorPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse_transport(value)
    }
}

/// One page of results plus the token for the following page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows of this page.
    pub data: Vec<T>,
    /// Opaque token for the next page; absent at the end of results.
    pub next_cursor: Option<String>,
}

/// Validates a requested page size.
pub fn page_limit(requested: Option<usize>) -> AppResult<usize> {
    match requested {
        None => Ok(DEFAULT_PAGE_LIMIT),
        Some(0) => Err(AppError::Validation(
            "limit must be a positive integer".to_owned(),
        )),
        Some(limit) => Ok(limit.min(MAX_PAGE_LIMIT)),
    }
}

/// Decodes an optional cursor token under the given policy.
pub fn resolve_cursor(
    token: Option<&str>,
    policy: InvalidCursorPolicy,
) -> AppResult<Option<PageCursor>> {
    let Some(token) = token.filter(|token| !token.trim().is_empty()) else {
        return Ok(None);
    };

    match (PageCursor::decode(token), policy) {
        (Ok(cursor), _) => Ok(Some(cursor)),
        (Err(error), InvalidCursorPolicy::Reject) => Err(error),
        (Err(error), InvalidCursorPolicy::Ignore) => {
            warn!(%error, "ignoring malformed pagination cursor");
            Ok(None)
        }
    }
}

/// Trims a `limit + 1` fetch to `limit` rows and derives the next cursor.
pub fn split_page<T, F>(mut rows: Vec<T>, limit: usize, cursor_of: F) -> Page<T>
where
    F: Fn(&T) -> Option<PageCursor>,
{
    if rows.len() <= limit {
        return Page {
            data: rows,
            next_cursor: None,
        };
    }

    rows.truncate(limit);
    let next_cursor = rows.last().and_then(cursor_of).map(|cursor| cursor.encode());

    Page {
        data: rows,
        next_cursor,
    }
}
