use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{error::AppError, state::AppState};
use crate::{
    product::{is_truthy, is_valid_query, Definition, Definitions, SearchResults, MIN_QUERY_LEN},
    store::InsertOutcome,
};

type SharedState = State<Arc<AppState>>;

/// First path segments taken by fixed routes. A category with one of these
/// names could never be reached through `/{category}/...`.
pub const RESERVED_CATEGORIES: [&str; 11] = [
    "categories",
    "get-schema",
    "hot-selling",
    "insert-definitions",
    "insert-products",
    "insert-schema",
    "price-history",
    "products",
    "recommended",
    "search",
    "update-price",
];

fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        warn!("Rejected request body: {rejection}");
        AppError::InvalidJson
    })
}

// Schemas

pub async fn categories(State(state): SharedState) -> Result<Json<Vec<String>>, AppError> {
    let categories = state
        .catalog
        .categories()
        .await
        .map_err(AppError::internal("Error fetching categories"))?;
    Ok(Json(categories))
}

pub async fn schema(
    State(state): SharedState,
    Path(category): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .catalog
        .schema_document(&category)
        .await
        .map_err(AppError::internal("Error fetching schema definition"))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Schema not found for this category".into()))
}

pub async fn insert_schema(
    State(state): SharedState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let schema = match body(payload)? {
        Value::Object(schema)
            if schema
                .get("Category")
                .and_then(Value::as_str)
                .is_some_and(|category| !category.is_empty()) =>
        {
            schema
        }
        _ => return Err(AppError::BadRequest("'Category' is required".into())),
    };
    if let Some(reserved) = schema
        .get("Category")
        .and_then(Value::as_str)
        .filter(|category| RESERVED_CATEGORIES.contains(category))
    {
        return Err(AppError::BadRequest(format!(
            "'{reserved}' is reserved and cannot be used as a category"
        )));
    }

    let schema = state
        .catalog
        .upsert_schema(schema)
        .await
        .map_err(AppError::internal("Error inserting/updating schema"))?;
    info!("Upserted schema for {}", schema["Category"]);

    Ok(Json(json!({
        "success": true,
        "message": "Schema inserted/updated successfully",
        "schema": schema,
    })))
}

// Selection cascade

pub async fn brands(
    State(state): SharedState,
    Path(category): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let brands = state
        .catalog
        .brands(&category)
        .await
        .map_err(AppError::internal("Error fetching brands"))?;
    Ok(Json(brands))
}

pub async fn models(
    State(state): SharedState,
    Path((category, brand)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, AppError> {
    let models = state
        .catalog
        .models(&category, &brand)
        .await
        .map_err(AppError::internal("Error fetching models"))?;
    Ok(Json(models))
}

pub async fn product_details(
    State(state): SharedState,
    Path((category, brand, model)): Path<(String, String, String)>,
) -> Result<Json<Value>, AppError> {
    state
        .catalog
        .product(&category, &brand, &model)
        .await
        .map_err(AppError::internal("Error fetching product data"))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".into()))
}

pub async fn definitions(
    State(state): SharedState,
    Path(category): Path<String>,
) -> Result<Json<Definitions>, AppError> {
    let definitions = state
        .catalog
        .definitions(&category)
        .await
        .map_err(AppError::internal("Error fetching definitions"))?;
    Ok(Json(definitions))
}

#[derive(Deserialize)]
pub struct DefinitionsPayload {
    category: String,
    definitions: Vec<Definition>,
}

pub async fn insert_definitions(
    State(state): SharedState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let payload: DefinitionsPayload = serde_json::from_value(body(payload)?)
        .ok()
        .filter(|payload: &DefinitionsPayload| !payload.category.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("'category' and 'definitions' are required".into())
        })?;

    let count = state
        .catalog
        .upsert_definitions(&payload.category, payload.definitions)
        .await
        .map_err(AppError::internal("Error inserting definitions"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Definitions inserted/updated successfully",
        "count": count,
    })))
}

// Search

#[derive(Deserialize)]
pub struct SearchParams {
    query: Option<String>,
}

pub async fn search_in_category(
    State(state): SharedState,
    Path(category): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, AppError> {
    search(&state, Some(&category), params).await
}

pub async fn search_all(
    State(state): SharedState,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, AppError> {
    search(&state, None, params).await
}

async fn search(
    state: &AppState,
    category: Option<&str>,
    params: SearchParams,
) -> Result<Json<SearchResults>, AppError> {
    let Some(query) = params
        .query
        .filter(|query| is_valid_query(Some(query.as_str())))
    else {
        return Err(AppError::BadRequest(format!(
            "Query parameter is required and must be at least {MIN_QUERY_LEN} characters long for suggestions."
        )));
    };

    let hits = state
        .catalog
        .search(category, &query)
        .await
        .map_err(AppError::internal("Error searching products"))?;
    if hits.is_empty() {
        return Err(AppError::NoMatches);
    }

    Ok(Json(SearchResults::new(hits)))
}

// Writes

pub async fn insert_products(
    State(state): SharedState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let (products, bulk) = match body(payload)? {
        Value::Array(products) => (products, true),
        product => (vec![product], false),
    };

    match state
        .catalog
        .insert_products(products)
        .await
        .map_err(AppError::internal("Error inserting products"))?
    {
        InsertOutcome::Rejected(reason) => {
            warn!("Rejected product insert: {reason}");
            Err(AppError::BadRequest(reason))
        }
        InsertOutcome::Inserted(count) => {
            info!("Inserted {count} products");
            let message = if bulk {
                "Bulk products inserted successfully"
            } else {
                "Product inserted successfully"
            };
            Ok(Json(json!({ "message": message })))
        }
    }
}

pub async fn update_price(
    State(state): SharedState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let body = body(payload)?;
    let text = |key: &str| body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());

    let (Some(category), Some(brand), Some(name), Some(price)) = (
        text("category"),
        text("brand"),
        text("name"),
        body.get("price").filter(|price| is_truthy(price)),
    ) else {
        return Err(AppError::BadRequest("Missing required fields".into()));
    };

    let recorded = state
        .prices
        .record(category, brand, name, price.clone())
        .await
        .map_err(AppError::internal("Error updating price"))?;
    if recorded.is_none() {
        return Ok(Json(json!({
            "success": false,
            "message": "No price change detected",
        })));
    }

    let updated = state
        .catalog
        .set_price(category, brand, name, price.clone())
        .await
        .map_err(AppError::internal("Error updating price"))?;
    info!("Recorded new price {price} for {category}/{brand}/{name}");

    Ok(Json(json!({
        "success": true,
        "message": "Price updated successfully",
        "updatedProduct": updated,
    })))
}

// Listings

pub async fn products_in_category(
    State(state): SharedState,
    Path(category): Path<String>,
) -> Result<Json<Value>, AppError> {
    let products = state
        .catalog
        .products_in(&category)
        .await
        .map_err(AppError::internal("Error fetching products"))?;
    if products.is_empty() {
        return Err(AppError::NotFound(
            "No products found in this category".into(),
        ));
    }
    Ok(Json(json!({ "count": products.len(), "products": products })))
}

pub async fn recommended_by_brand(
    State(state): SharedState,
    Path((category, brand)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let products = state
        .catalog
        .recommended_by_brand(&category, &brand)
        .await
        .map_err(AppError::internal(
            "Error fetching recommended products from the same brand",
        ))?;
    if products.is_empty() {
        return Err(AppError::NotFound(
            "No recommended products found from the same brand".into(),
        ));
    }
    Ok(Json(
        json!({ "count": products.len(), "recommendedProducts": products }),
    ))
}

pub async fn recommended_by_category(
    State(state): SharedState,
    Path(category): Path<String>,
) -> Result<Json<Value>, AppError> {
    let products = state
        .catalog
        .recommended_by_category(&category)
        .await
        .map_err(AppError::internal(
            "Error fetching recommended products from the same category",
        ))?;
    if products.is_empty() {
        return Err(AppError::NotFound(
            "No recommended products found from the same category".into(),
        ));
    }
    Ok(Json(
        json!({ "count": products.len(), "recommendedProducts": products }),
    ))
}

pub async fn hot_selling(State(state): SharedState) -> Result<Json<Value>, AppError> {
    let products = state
        .catalog
        .hot_selling()
        .await
        .map_err(AppError::internal("Error fetching hot selling products"))?;
    Ok(Json(
        json!({ "count": products.len(), "hotSellingProducts": products }),
    ))
}

pub async fn price_history(
    State(state): SharedState,
    Path((category, brand, model)): Path<(String, String, String)>,
) -> Result<Json<Value>, AppError> {
    let history = state
        .prices
        .history(&category, &brand, &model)
        .await
        .map_err(AppError::internal("Error fetching price history"))?;
    Ok(Json(
        json!({ "count": history.len(), "priceHistory": history }),
    ))
}
