//! Compare two products of a category feature by feature.
//!
//! The crate has two halves:
//!
//! - a REST backend ([`server`]) over SQLite document stores ([`store`])
//!   serving categories, brands, models, product details, search, listings
//!   and price history;
//! - a client side: [`CatalogClient`] talks to that backend,
//!   [`SelectionController`] walks the category → brand → model cascade and
//!   [`compare`] merges two feature trees into a side-by-side table.

pub mod client;
pub mod compare;
pub mod product;
pub mod selection;
pub mod server;
pub mod store;

use header::{HeaderMap, HeaderValue};
use reqwest::header;

pub use client::CatalogClient;
pub use compare::ComparisonTable;
pub use product::Product;
pub use selection::{CatalogSource, SelectionController, Side};
pub use url::Url;

/// Builds the default headers for the client.
fn build_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(concat!("compare-buy-repeat/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}
