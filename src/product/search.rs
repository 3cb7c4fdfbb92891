use serde::{Deserialize, Serialize};

/// Shortest query accepted by the search endpoints.
pub const MIN_QUERY_LEN: usize = 3;
/// Most hits returned by a single search.
pub const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Product found in search results
pub struct SearchHit {
    /// Name of the product
    pub name: String,
    /// Brand of the product
    pub brand: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
/// Search results for a query, optionally limited to one category.
pub struct SearchResults {
    /// Number of hits, always `products.len()`.
    pub count: usize,
    /// List of search results, at most [`SEARCH_LIMIT`].
    pub products: Vec<SearchHit>,
}

impl SearchResults {
    pub fn new(products: Vec<SearchHit>) -> Self {
        Self {
            count: products.len(),
            products,
        }
    }
}

/// Whether `query` is long enough to search for.
pub fn is_valid_query(query: Option<&str>) -> bool {
    query.is_some_and(|query| query.chars().count() >= MIN_QUERY_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_length() {
        assert!(!is_valid_query(None));
        assert!(!is_valid_query(Some("ab")));
        assert!(is_valid_query(Some("abc")));
        assert!(is_valid_query(Some("äöü")));
    }
}
