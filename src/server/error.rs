use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("No matching products found")]
    NoMatches,

    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    /// Maps a store failure to a 500 carrying `context` as its message.
    pub fn internal(context: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Internal { context, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidJson | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::NoMatches => StatusCode::NOT_FOUND,
            AppError::Internal { context, source } => {
                error!("{context}: {source}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match &self {
            AppError::NoMatches => json!({ "error": self.to_string(), "count": 0 }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
