//! REST backend over the catalog and price stores.

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use eyre::{Result, WrapErr};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::Config;
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/categories", get(routes::categories))
        .route("/get-schema/{category}", get(routes::schema))
        .route("/insert-schema", post(routes::insert_schema))
        .route("/insert-products", post(routes::insert_products))
        .route("/insert-definitions", post(routes::insert_definitions))
        .route("/update-price", post(routes::update_price))
        .route("/search", get(routes::search_all))
        .route("/hot-selling", get(routes::hot_selling))
        .route("/products/{category}", get(routes::products_in_category))
        .route(
            "/recommended/brand/{category}/{brand}",
            get(routes::recommended_by_brand),
        )
        .route(
            "/recommended/category/{category}",
            get(routes::recommended_by_category),
        )
        .route(
            "/price-history/{category}/{brand}/{model}",
            get(routes::price_history),
        )
        .route("/{category}/brands", get(routes::brands))
        .route("/{category}/definitions", get(routes::definitions))
        .route("/{category}/search", get(routes::search_in_category))
        .route("/{category}/{brand}/models", get(routes::models))
        .route(
            "/{category}/{brand}/{model}/productDetails",
            get(routes::product_details),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Opens the stores named in `config` and serves until Ctrl+C or SIGTERM.
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing state...");
    let state = AppState::open(&config)?;

    let address = config.address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
