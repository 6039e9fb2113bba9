//! Cursor pagination
//!
//! Pages look like `{"data": [...], "cursor": "...", "has_more": true}`. The
//! first request carries only the page size; later requests add the cursor
//! returned by the previous page.

use super::types::{NextPage, PaginationState, StopReason};
use serde_json::Value;

/// Cursor paginator with a request ceiling
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Query parameter name for the cursor
    pub cursor_param: String,
    /// Query parameter name for the page size
    pub limit_param: String,
    /// Rows requested per page
    pub page_size: u32,
    /// Total requests allowed, including the first one
    pub max_fetches: u32,
}

impl CursorPaginator {
    /// Paginator using `cursor` and `limit` query parameters
    pub fn new(page_size: u32, max_fetches: u32) -> Self {
        Self {
            cursor_param: "cursor".to_string(),
            limit_param: "limit".to_string(),
            page_size,
            max_fetches,
        }
    }

    /// Query parameters for the next request
    pub fn request_params(&self, state: &PaginationState) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(cursor) = &state.cursor {
            params.push((self.cursor_param.clone(), cursor.clone()));
        }
        params.push((self.limit_param.clone(), self.page_size.to_string()));
        params
    }

    /// Whether another request may be issued
    pub fn can_fetch(&self, state: &PaginationState) -> bool {
        !state.is_done() && state.pages_fetched < self.max_fetches
    }

    /// Read the envelope of a successfully fetched page
    ///
    /// `records_count` is the number of rows accepted from this page.
    pub fn process_page(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count as u64);

        let next = match body.get("has_more").and_then(Value::as_bool) {
            None => NextPage::Done(StopReason::MissingHasMore),
            Some(false) => NextPage::Done(StopReason::Exhausted),
            Some(true) => match extract_cursor(body) {
                None => NextPage::Done(StopReason::MissingCursor),
                Some(_) if state.pages_fetched >= self.max_fetches => {
                    NextPage::Done(StopReason::PageCap)
                }
                Some(cursor) => {
                    state.set_cursor(cursor.clone());
                    NextPage::Continue { cursor }
                }
            },
        };

        if let NextPage::Done(reason) = next {
            state.mark_done(reason);
        }
        next
    }

    /// End pagination after a failed request
    pub fn fail(&self, state: &mut PaginationState) -> NextPage {
        state.mark_done(StopReason::RequestFailed);
        NextPage::Done(StopReason::RequestFailed)
    }
}

/// Cursor as text; numbers are accepted, empty strings are not
fn extract_cursor(body: &Value) -> Option<String> {
    match body.get("cursor")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
