//! Sales feed connector
//!
//! Fetches sales records from the ticketing REST API:
//!
//! 1. `cache_authentication_token` runs the OAuth client-credentials flow and
//!    writes the bearer token to the injected secret store.
//! 2. `get_sales` walks the cursor-paginated `/sales` endpoint, normalizes
//!    each page's rows and validates them against the input schema.
//!
//! Pagination is best effort by default: a failed or malformed page is logged
//! and skipped, and the rows gathered so far are returned. Setting `strict`
//! turns malformed pages into errors.

mod client;
mod normalize;

pub use client::{SalesFeedClient, SalesFetchReport};
pub use normalize::{normalize_key, normalize_record, TRANSACTION_DATE_LEN};
