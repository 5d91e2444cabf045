//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use myury_core::{Error as CoreError, StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store error by the domain error it wraps, if any.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    match err.as_core() {
      Some(
        CoreError::UnknownKey(_)
        | CoreError::UnknownKeyId(_)
        | CoreError::TermNotFound(_),
      ) => Self::NotFound(err.to_string()),
      Some(
        CoreError::InvalidTable(_)
        | CoreError::InvalidOwnerField { .. }
        | CoreError::MultipleValuesNotAllowed(_)
        | CoreError::InvalidDay(_)
        | CoreError::InvalidSlot(_)
        | CoreError::InvalidTerm(_),
      ) => Self::BadRequest(err.to_string()),
      None => Self::Store(Box::new(err)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
