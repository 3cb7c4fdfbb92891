//! Catalog data model: product documents, their feature trees, category
//! schemas, feature definitions and search results.

mod definitions;
mod features;
#[allow(clippy::module_inception)]
mod product;
mod schema;
mod search;

pub use definitions::{Definition, Definitions};
pub use features::{is_truthy, FeatureMap, FeatureValue, Scalar};
pub use product::Product;
pub use schema::{Schema, SchemaSettings};
pub use search::{is_valid_query, SearchHit, SearchResults, MIN_QUERY_LEN, SEARCH_LIMIT};
