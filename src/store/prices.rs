use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Db, StoreError};

const SCHEMA_VERSION: i32 = 1;

/// Most records returned by [`PriceStore::history`].
pub const HISTORY_LIMIT: usize = 50;

const TABLES: &str = "CREATE TABLE IF NOT EXISTS price_updates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        brand TEXT NOT NULL,
        product_name TEXT NOT NULL,
        price TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS price_updates_by_product
        ON price_updates (category, brand, product_name);";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One observed price of a product.
pub struct PriceRecord {
    pub category: String,
    pub brand: String,
    pub product_name: String,
    /// The price exactly as it was submitted.
    pub price: Value,
    pub timestamp: DateTime<Utc>,
}

/// Price history, kept in its own database.
#[derive(Clone)]
pub struct PriceStore {
    db: Db,
}

impl PriceStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            db: Db::open(path, SCHEMA_VERSION, TABLES)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            db: Db::open_in_memory(SCHEMA_VERSION, TABLES)?,
        })
    }

    /// Appends a record unless `price` equals the latest recorded price of
    /// the product. Returns the new record, or `None` when nothing changed.
    pub async fn record(
        &self,
        category: &str,
        brand: &str,
        product_name: &str,
        price: Value,
    ) -> Result<Option<PriceRecord>, StoreError> {
        let record = PriceRecord {
            category: category.to_owned(),
            brand: brand.to_owned(),
            product_name: product_name.to_owned(),
            price,
            timestamp: Utc::now().trunc_subsecs(3),
        };

        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;

                let last: Option<String> = tx
                    .query_row(
                        "SELECT price FROM price_updates
                         WHERE category = ?1 AND brand = ?2 AND product_name = ?3
                         ORDER BY id DESC LIMIT 1",
                        params![record.category, record.brand, record.product_name],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(last) = last {
                    if same_price(&serde_json::from_str::<Value>(&last)?, &record.price) {
                        return Ok(None);
                    }
                }

                tx.execute(
                    "INSERT INTO price_updates (category, brand, product_name, price, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.category,
                        record.brand,
                        record.product_name,
                        serde_json::to_string(&record.price)?,
                        record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                    ],
                )?;
                tx.commit()?;

                Ok(Some(record))
            })
            .await
    }

    /// Newest records first, at most [`HISTORY_LIMIT`].
    pub async fn history(
        &self,
        category: &str,
        brand: &str,
        product_name: &str,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        let (category, brand, product_name) =
            (category.to_owned(), brand.to_owned(), product_name.to_owned());
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT price, timestamp FROM price_updates
                     WHERE category = ?1 AND brand = ?2 AND product_name = ?3
                     ORDER BY id DESC LIMIT ?4",
                )?;
                let rows = stmt
                    .query_map(
                        params![category, brand, product_name, HISTORY_LIMIT as i64],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                    )?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(price, timestamp)| -> Result<PriceRecord, StoreError> {
                        Ok(PriceRecord {
                            category: category.clone(),
                            brand: brand.clone(),
                            product_name: product_name.clone(),
                            price: serde_json::from_str(&price)?,
                            timestamp: DateTime::parse_from_rfc3339(&timestamp)?
                                .with_timezone(&Utc),
                        })
                    })
                    .collect()
            })
            .await
    }
}

/// Numbers compare by value, so `100` and `100.0` are the same price.
fn same_price(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_unchanged_price_is_not_recorded() {
        let store = PriceStore::open_in_memory().unwrap();

        let first = store
            .record("Phones", "Google", "Pixel 8", json!(699))
            .await
            .unwrap();
        assert!(first.is_some());

        let repeat = store
            .record("Phones", "Google", "Pixel 8", json!(699.0))
            .await
            .unwrap();
        assert!(repeat.is_none());

        let changed = store
            .record("Phones", "Google", "Pixel 8", json!(649))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(changed.price, json!(649));

        let history = store.history("Phones", "Google", "Pixel 8").await.unwrap();
        let prices: Vec<_> = history.iter().map(|r| r.price.clone()).collect();
        assert_eq!(prices, [json!(649), json!(699)]);
        assert_eq!(history[0], changed);
    }

    #[tokio::test]
    async fn test_products_are_tracked_separately() {
        let store = PriceStore::open_in_memory().unwrap();
        store.record("Phones", "Google", "Pixel 8", json!(699)).await.unwrap();

        let other = store
            .record("Phones", "Google", "Pixel 7", json!(699))
            .await
            .unwrap();
        assert!(other.is_some());
        assert_eq!(store.history("Phones", "Google", "Pixel 7").await.unwrap().len(), 1);
    }

    #[test]
    fn test_string_and_number_prices_differ() {
        assert!(!same_price(&json!("100"), &json!(100)));
        assert!(same_price(&json!(100), &json!(100.0)));
    }
}
