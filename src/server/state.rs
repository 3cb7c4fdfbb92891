use std::sync::Arc;

use eyre::{Result, WrapErr};
use tracing::info;

use super::config::Config;
use crate::store::{CatalogStore, PriceStore};

/// Handles shared by every route.
pub struct AppState {
    pub catalog: CatalogStore,
    pub prices: PriceStore,
}

impl AppState {
    pub fn new(catalog: CatalogStore, prices: PriceStore) -> Arc<Self> {
        Arc::new(Self { catalog, prices })
    }

    /// Opens both databases named in `config`.
    pub fn open(config: &Config) -> Result<Arc<Self>> {
        info!("Opening catalog database at {}", config.primary_db.display());
        let catalog = CatalogStore::open(&config.primary_db).wrap_err_with(|| {
            format!(
                "Failed to open catalog database at {}",
                config.primary_db.display()
            )
        })?;

        info!("Opening price database at {}", config.secondary_db.display());
        let prices = PriceStore::open(&config.secondary_db).wrap_err_with(|| {
            format!(
                "Failed to open price database at {}",
                config.secondary_db.display()
            )
        })?;

        Ok(Self::new(catalog, prices))
    }
}
