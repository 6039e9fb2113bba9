//! Pagination types
//!
//! State carried across the requests of one fetch and the outcome of each
//! processed page.

use std::fmt;

/// Why pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last page reported `has_more: false`
    Exhausted,
    /// The page had no usable `has_more` flag
    MissingHasMore,
    /// `has_more` was true but no cursor was supplied
    MissingCursor,
    /// The request ceiling was reached
    PageCap,
    /// A request returned a non-success status or an unreadable body
    RequestFailed,
}

impl StopReason {
    /// Whether the stop indicates a malformed or failed page
    pub fn is_degraded(self) -> bool {
        !matches!(self, Self::Exhausted | Self::PageCap)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Exhausted => "no more pages",
            Self::MissingHasMore => "page has no has_more flag",
            Self::MissingCursor => "has_more set without a cursor",
            Self::PageCap => "page fetch limit reached",
            Self::RequestFailed => "page request failed",
        };
        f.write_str(text)
    }
}

/// Result of processing one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Request the page at this cursor
    Continue {
        /// Cursor value for the next request
        cursor: String,
    },
    /// No further requests
    Done(StopReason),
}

/// Tracks pagination state during one fetch
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Requests issued so far
    pub pages_fetched: u32,
    /// Cursor for the next request
    pub cursor: Option<String>,
    /// Rows accepted so far
    pub total_fetched: u64,
    /// Why pagination ended, once it has
    pub stop_reason: Option<StopReason>,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Is pagination complete?
    pub fn is_done(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Mark pagination as complete, keeping the first reason recorded
    pub fn mark_done(&mut self, reason: StopReason) {
        self.stop_reason.get_or_insert(reason);
    }

    /// Count an issued request
    pub fn record_request(&mut self) {
        self.pages_fetched += 1;
    }

    /// Set cursor
    pub fn set_cursor(&mut self, cursor: String) {
        self.cursor = Some(cursor);
    }

    /// Add to total fetched
    pub fn add_fetched(&mut self, count: u64) {
        self.total_fetched += count;
    }
}
