use eyre::{bail, eyre, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::{
    product::{Definitions, Product, SearchHit, SearchResults},
    selection::CatalogSource,
};

/// HTTP client for the catalog backend.
///
/// ```no_run
/// use compare_buy_repeat::{CatalogClient, Url};
///
/// # async fn run() -> eyre::Result<()> {
/// let client = CatalogClient::new(Url::parse("http://127.0.0.1:3000")?)?;
/// let brands = client.brands("Phones").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base: Url,
    client: Client,
}

impl CatalogClient {
    pub fn new(base: Url) -> Result<Self> {
        if base.cannot_be_a_base() {
            bail!("{base} cannot be used as a server address");
        }
        let client = Client::builder()
            .default_headers(crate::build_headers())
            .build()?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| eyre!("{} cannot be used as a server address", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {url}");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("GET {url} failed with {status}");
        }
        Ok(response.json().await?)
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.get(self.endpoint(&["categories"])?).await
    }

    pub async fn brands(&self, category: &str) -> Result<Vec<String>> {
        self.get(self.endpoint(&[category, "brands"])?).await
    }

    pub async fn models(&self, category: &str, brand: &str) -> Result<Vec<String>> {
        self.get(self.endpoint(&[category, brand, "models"])?).await
    }

    pub async fn product_details(
        &self,
        category: &str,
        brand: &str,
        model: &str,
    ) -> Result<Product> {
        self.get(self.endpoint(&[category, brand, model, "productDetails"])?)
            .await
    }

    pub async fn definitions(&self, category: &str) -> Result<Definitions> {
        self.get(self.endpoint(&[category, "definitions"])?).await
    }

    /// Searches one category, or every category when `category` is `None`.
    /// A query with no matches yields an empty list rather than an error.
    pub async fn search(&self, category: Option<&str>, query: &str) -> Result<Vec<SearchHit>> {
        let mut url = match category {
            Some(category) => self.endpoint(&[category, "search"])?,
            None => self.endpoint(&["search"])?,
        };
        url.query_pairs_mut().append_pair("query", query);

        debug!("GET {url}");
        let response = self.client.get(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => {
                Ok(response.json::<SearchResults>().await?.products)
            }
            status => bail!("GET {url} failed with {status}"),
        }
    }
}

impl CatalogSource for CatalogClient {
    async fn brands(&self, category: &str) -> Result<Vec<String>> {
        CatalogClient::brands(self, category).await
    }

    async fn models(&self, category: &str, brand: &str) -> Result<Vec<String>> {
        CatalogClient::models(self, category, brand).await
    }

    async fn product_details(&self, category: &str, brand: &str, model: &str) -> Result<Product> {
        CatalogClient::product_details(self, category, brand, model).await
    }

    async fn definitions(&self, category: &str) -> Result<Definitions> {
        CatalogClient::definitions(self, category).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = CatalogClient::new(Url::parse("http://localhost:3000/api/").unwrap()).unwrap();
        let url = client
            .endpoint(&["Phones", "Google", "Pixel 8/Pro", "productDetails"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/Phones/Google/Pixel%208%2FPro/productDetails"
        );
    }

    #[test]
    fn test_endpoint_on_bare_host() {
        let client = CatalogClient::new(Url::parse("http://localhost:3000").unwrap()).unwrap();
        assert_eq!(
            client.endpoint(&["categories"]).unwrap().as_str(),
            "http://localhost:3000/categories"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(CatalogClient::new(Url::parse("mailto:someone@example.com").unwrap()).is_err());
    }
}
