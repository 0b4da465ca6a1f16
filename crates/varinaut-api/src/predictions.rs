//! Handlers for `/predictions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/predictions/` | Optional `?skip=<n>&limit=<n>`; id order |
//! | `GET`  | `/predictions/{id}` | 404 if not found |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{PathRejection, QueryRejection},
  },
};
use serde::Deserialize;
use varinaut_core::{
  prediction::Prediction,
  store::{Page, PredictionStore},
};

use crate::{AppState, error::ApiError};

/// Message returned with every 404 from this module.
pub const NOT_FOUND: &str = "Prediction not found";

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Rows to skip before the page starts. Default 0.
  #[serde(default)]
  pub skip:  u64,
  /// Page size. Defaults to the configured page size and is capped at the
  /// configured maximum.
  pub limit: Option<u64>,
}

/// `GET /predictions/[?skip=<n>][&limit=<n>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Prediction>>, ApiError>
where
  S: PredictionStore,
{
  let Query(params) = params?;
  let limit = params.limit.unwrap_or(state.paging.default_limit);
  if limit == 0 {
    return Err(ApiError::Validation("limit must be greater than 0".into()));
  }
  let page = Page::new(params.skip, limit).clamped(state.paging.max_limit);

  let predictions = state
    .store
    .list_predictions(page)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(predictions))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /predictions/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Prediction>, ApiError>
where
  S: PredictionStore,
{
  let Path(id) = id?;
  let prediction = state
    .store
    .get_prediction(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_owned()))?;
  Ok(Json(prediction))
}
