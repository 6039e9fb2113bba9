//! Pagination module
//!
//! Cursor pagination over `{ data, cursor, has_more }` page envelopes with a
//! hard ceiling on the number of requests per fetch.
//!
//! # Overview
//!
//! The paginator builds the query for each request and reads the envelope of
//! each response to decide whether another page is requested. It never
//! performs I/O itself; the sales client drives the loop.

mod cursor;
mod types;

pub use cursor::CursorPaginator;
pub use types::{NextPage, PaginationState, StopReason};
