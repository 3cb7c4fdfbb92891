use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Params};
use serde_json::{Map, Value};

use super::{Db, StoreError};
use crate::product::{Definition, Definitions, Schema, SearchHit, SEARCH_LIMIT};

/// Bump when changing table layouts.
const SCHEMA_VERSION: i32 = 1;

/// Most documents returned by the listing and recommendation queries.
pub const LISTING_LIMIT: usize = 10;

const TABLES: &str = "CREATE TABLE IF NOT EXISTS schemas (
        category TEXT PRIMARY KEY,
        document TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        brand TEXT NOT NULL,
        name TEXT NOT NULL,
        rating REAL,
        document TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS products_by_category
        ON products (category COLLATE NOCASE, brand COLLATE NOCASE);
    CREATE TABLE IF NOT EXISTS definitions (
        category TEXT NOT NULL,
        feature TEXT NOT NULL,
        definition TEXT NOT NULL,
        PRIMARY KEY (category, feature)
    );";

/// Fields kept by [`CatalogStore::products_in`].
const LISTING_FIELDS: [&str; 4] = ["name", "brand", "image", "price"];

/// Result of a product insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Every product was stored.
    Inserted(usize),
    /// Nothing was stored; the message says which product failed and why.
    Rejected(String),
}

/// Schemas, products and feature definitions.
#[derive(Clone)]
pub struct CatalogStore {
    db: Db,
}

impl CatalogStore {
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

    // Schemas

    /// Distinct category names, sorted.
    pub async fn categories(&self) -> Result<Vec<String>, StoreError> {
        self.db
            .call(|conn| strings(conn, "SELECT category FROM schemas ORDER BY category", []))
            .await
    }

    pub async fn schema_document(&self, category: &str) -> Result<Option<Value>, StoreError> {
        let category = category.to_owned();
        self.db
            .call(move |conn| {
                schema_text(conn, &category)?
                    .map(|text| serde_json::from_str(&text).map_err(StoreError::from))
                    .transpose()
            })
            .await
    }

    /// Inserts the schema, or merges its top-level fields into the existing
    /// schema with the same `Category`. Returns the stored document.
    pub async fn upsert_schema(&self, schema: Map<String, Value>) -> Result<Value, StoreError> {
        self.db
            .call(move |conn| {
                let category = text_field(&schema, "Category");
                let tx = conn.transaction()?;

                let existing: Option<String> = tx
                    .query_row(
                        "SELECT document FROM schemas WHERE category = ?1",
                        params![category],
                        |row| row.get(0),
                    )
                    .optional()?;
                let mut merged: Map<String, Value> = match existing {
                    Some(text) => serde_json::from_str(&text)?,
                    None => Map::new(),
                };
                merged.extend(schema);

                tx.execute(
                    "INSERT OR REPLACE INTO schemas (category, document) VALUES (?1, ?2)",
                    params![category, serde_json::to_string(&merged)?],
                )?;
                tx.commit()?;

                Ok(Value::Object(merged))
            })
            .await
    }

    // Products

    pub async fn brands(&self, category: &str) -> Result<Vec<String>, StoreError> {
        let category = category.to_owned();
        self.db
            .call(move |conn| {
                strings(
                    conn,
                    "SELECT DISTINCT brand FROM products
                     WHERE category = ?1 COLLATE NOCASE
                     ORDER BY brand",
                    params![category],
                )
            })
            .await
    }

    pub async fn models(&self, category: &str, brand: &str) -> Result<Vec<String>, StoreError> {
        let (category, brand) = (category.to_owned(), brand.to_owned());
        self.db
            .call(move |conn| {
                strings(
                    conn,
                    "SELECT DISTINCT name FROM products
                     WHERE category = ?1 COLLATE NOCASE AND brand = ?2 COLLATE NOCASE
                     ORDER BY name",
                    params![category, brand],
                )
            })
            .await
    }

    /// The first product matching all three names, ignoring case.
    pub async fn product(
        &self,
        category: &str,
        brand: &str,
        model: &str,
    ) -> Result<Option<Value>, StoreError> {
        let (category, brand, model) = (category.to_owned(), brand.to_owned(), model.to_owned());
        self.db
            .call(move |conn| {
                let mut found = documents(
                    conn,
                    "SELECT document FROM products
                     WHERE category = ?1 COLLATE NOCASE
                       AND brand = ?2 COLLATE NOCASE
                       AND name = ?3 COLLATE NOCASE
                     ORDER BY id LIMIT 1",
                    params![category, brand, model],
                )?;
                Ok(found.pop())
            })
            .await
    }

    /// Products whose name or brand contains `query`, ignoring case.
    pub async fn search(
        &self,
        category: Option<&str>,
        query: &str,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let (category, query) = (category.map(str::to_owned), query.to_owned());
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT name, brand FROM products
                     WHERE (?1 IS NULL OR category = ?1 COLLATE NOCASE)
                       AND (instr(lower(name), lower(?2)) > 0 OR instr(lower(brand), lower(?2)) > 0)
                     ORDER BY id LIMIT ?3",
                )?;
                let hits = stmt
                    .query_map(params![category, query, SEARCH_LIMIT as i64], |row| {
                        Ok(SearchHit {
                            name: row.get(0)?,
                            brand: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(hits)
            })
            .await
    }

    /// Validates every product against its category schema, then inserts all
    /// of them in one transaction. A single invalid product rejects the batch.
    pub async fn insert_products(&self, products: Vec<Value>) -> Result<InsertOutcome, StoreError> {
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;

                for product in &products {
                    let category = product
                        .get("category")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let Some(schema) = find_schema(&tx, category)? else {
                        return Ok(InsertOutcome::Rejected(format!(
                            "Schema not found for category: {category}"
                        )));
                    };
                    if let Some(field) = schema.missing_field(product) {
                        return Ok(InsertOutcome::Rejected(format!(
                            "Missing or empty mandatory field: {field}"
                        )));
                    }
                }

                for product in &products {
                    let object = product.as_object().cloned().unwrap_or_default();
                    tx.execute(
                        "INSERT INTO products (category, brand, name, rating, document)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            text_field(&object, "category"),
                            text_field(&object, "brand"),
                            text_field(&object, "name"),
                            object.get("rating").and_then(Value::as_f64),
                            serde_json::to_string(product)?,
                        ],
                    )?;
                }
                tx.commit()?;

                Ok(InsertOutcome::Inserted(products.len()))
            })
            .await
    }

    /// Sets `price` on the product with exactly these names and returns the
    /// updated document.
    pub async fn set_price(
        &self,
        category: &str,
        brand: &str,
        name: &str,
        price: Value,
    ) -> Result<Option<Value>, StoreError> {
        let (category, brand, name) = (category.to_owned(), brand.to_owned(), name.to_owned());
        self.db
            .call(move |conn| {
                let found: Option<(i64, String)> = conn
                    .query_row(
                        "SELECT id, document FROM products
                         WHERE category = ?1 AND brand = ?2 AND name = ?3
                         ORDER BY id LIMIT 1",
                        params![category, brand, name],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let Some((id, text)) = found else {
                    return Ok(None);
                };

                let mut document: Value = serde_json::from_str(&text)?;
                if let Some(object) = document.as_object_mut() {
                    object.insert("price".to_string(), price);
                }
                conn.execute(
                    "UPDATE products SET document = ?1 WHERE id = ?2",
                    params![serde_json::to_string(&document)?, id],
                )?;

                Ok(Some(document))
            })
            .await
    }

    /// Up to [`LISTING_LIMIT`] products of exactly `category`, reduced to
    /// name, brand, image and price.
    pub async fn products_in(&self, category: &str) -> Result<Vec<Value>, StoreError> {
        let category = category.to_owned();
        let found = self
            .db
            .call(move |conn| {
                documents(
                    conn,
                    "SELECT document FROM products WHERE category = ?1 ORDER BY id LIMIT ?2",
                    params![category, LISTING_LIMIT as i64],
                )
            })
            .await?;

        Ok(found
            .into_iter()
            .map(|document| {
                let projected: Map<String, Value> = LISTING_FIELDS
                    .iter()
                    .filter_map(|field| {
                        document
                            .get(*field)
                            .map(|value| (field.to_string(), value.clone()))
                    })
                    .collect();
                Value::Object(projected)
            })
            .collect())
    }

    pub async fn recommended_by_brand(
        &self,
        category: &str,
        brand: &str,
    ) -> Result<Vec<Value>, StoreError> {
        let (category, brand) = (category.to_owned(), brand.to_owned());
        self.db
            .call(move |conn| {
                documents(
                    conn,
                    "SELECT document FROM products
                     WHERE category = ?1 COLLATE NOCASE AND brand = ?2 COLLATE NOCASE
                     ORDER BY id LIMIT ?3",
                    params![category, brand, LISTING_LIMIT as i64],
                )
            })
            .await
    }

    pub async fn recommended_by_category(&self, category: &str) -> Result<Vec<Value>, StoreError> {
        let category = category.to_owned();
        self.db
            .call(move |conn| {
                documents(
                    conn,
                    "SELECT document FROM products
                     WHERE category = ?1 COLLATE NOCASE
                     ORDER BY id LIMIT ?2",
                    params![category, LISTING_LIMIT as i64],
                )
            })
            .await
    }

    /// Highest rated products first; unrated products come last.
    pub async fn hot_selling(&self) -> Result<Vec<Value>, StoreError> {
        self.db
            .call(|conn| {
                documents(
                    conn,
                    "SELECT document FROM products ORDER BY rating DESC, id LIMIT ?1",
                    params![LISTING_LIMIT as i64],
                )
            })
            .await
    }

    // Definitions

    pub async fn definitions(&self, category: &str) -> Result<Definitions, StoreError> {
        let category = category.to_owned();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT feature, definition FROM definitions
                     WHERE category = ?1 COLLATE NOCASE
                     ORDER BY feature",
                )?;
                let definitions = stmt
                    .query_map(params![category], |row| {
                        Ok(Definition {
                            feature: row.get(0)?,
                            definition: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Definitions, _>>()?;
                Ok(definitions)
            })
            .await
    }

    pub async fn upsert_definitions(
        &self,
        category: &str,
        definitions: Vec<Definition>,
    ) -> Result<usize, StoreError> {
        let category = category.to_owned();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                for definition in &definitions {
                    tx.execute(
                        "INSERT OR REPLACE INTO definitions (category, feature, definition)
                         VALUES (?1, ?2, ?3)",
                        params![category, definition.feature, definition.definition],
                    )?;
                }
                tx.commit()?;
                Ok(definitions.len())
            })
            .await
    }
}

fn schema_text(conn: &Connection, category: &str) -> Result<Option<String>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT document FROM schemas WHERE category = ?1 COLLATE NOCASE LIMIT 1",
            params![category],
            |row| row.get(0),
        )
        .optional()?)
}

fn find_schema(conn: &Connection, category: &str) -> Result<Option<Schema>, StoreError> {
    schema_text(conn, category)?
        .map(|text| serde_json::from_str(&text).map_err(StoreError::from))
        .transpose()
}

fn strings<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn documents<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Value>, StoreError> {
    strings(conn, sql, params)?
        .iter()
        .map(|text| serde_json::from_str(text).map_err(StoreError::from))
        .collect()
}

fn text_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
