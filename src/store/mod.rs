//! SQLite-backed document stores.
//!
//! The catalog (schemas, products, definitions) and the price history live in
//! two separate databases, each behind its own [`CatalogStore`] or
//! [`PriceStore`] handle. Handles are cheap to clone and are opened once at
//! startup; failing to open or migrate either database is a startup error.
//!
//! Documents are kept as JSON text next to the few columns that queries
//! filter or sort on.

mod catalog;
mod prices;

use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;
use thiserror::Error;

pub use catalog::{CatalogStore, InsertOutcome, LISTING_LIMIT};
pub use prices::{PriceRecord, PriceStore, HISTORY_LIMIT};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Database schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: i32, expected: i32 },

    #[error("Store lock poisoned")]
    Poisoned,
}

/// A single SQLite connection shared by all clones of a store.
#[derive(Clone)]
struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    fn open(path: &Path, version: i32, tables: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn, version, tables)
    }

    fn open_in_memory(version: i32, tables: &str) -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, version, tables)
    }

    fn init(conn: Connection, version: i32, tables: &str) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;

        let found: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if found != 0 && found != version {
            return Err(StoreError::SchemaVersion {
                found,
                expected: version,
            });
        }

        conn.execute_batch(tables)?;
        conn.pragma_update(None, "user_version", version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut *conn)
        })
        .await?
    }
}
