//! Error types for the store engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Failure conditions raised by the registry and the command layer.
///
/// A missing key is not an error: key lookups return `Option`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Unknown cache or nested store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate cache or nested store name on create
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Attempt to delete the default cache
    #[error("Protected: {0}")]
    Protected(String),

    /// Compound key that cannot be split into cache/store/key segments
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Cache or store name that is empty or contains the `:` separator
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Key search pattern that does not compile as a glob or regex
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    pub(crate) fn cache_not_found(name: &str) -> Self {
        CacheError::NotFound(format!("cache '{}'", name))
    }

    pub(crate) fn store_not_found(cache: &str, store: &str) -> Self {
        CacheError::NotFound(format!("store '{}' in cache '{}'", store, cache))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::AlreadyExists(_) => StatusCode::CONFLICT,
            CacheError::Protected(_) => StatusCode::FORBIDDEN,
            CacheError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidName(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for registry and store operations.
pub type Result<T> = std::result::Result<T, CacheError>;
