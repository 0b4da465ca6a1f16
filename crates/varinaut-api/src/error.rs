//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"detail": "<message>"}`.

use axum::{
  Json,
  extract::rejection::{PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Store failures are logged; clients only see this.
pub const INTERNAL_ERROR_DETAIL: &str = "Internal Server Error";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  /// Malformed or out-of-range request input.
  #[error("{0}")]
  Validation(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::Validation(rejection.body_text())
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    ApiError::Validation(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let detail = match self {
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed");
        INTERNAL_ERROR_DETAIL.to_owned()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "detail": detail }))).into_response()
  }
}
