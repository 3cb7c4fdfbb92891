use std::path::PathBuf;

use clap::Args;

/// Backend settings, read from flags or the environment.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind to.
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub host: String,

    /// Catalog database: schemas, products and definitions.
    #[arg(long, env = "PRIMARY_DB_PATH", default_value = "comparebuyrepeat.db")]
    pub primary_db: PathBuf,

    /// Price history database.
    #[arg(long, env = "SECONDARY_DB_PATH", default_value = "price_updates.db")]
    pub secondary_db: PathBuf,
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
