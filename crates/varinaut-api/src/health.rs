//! Handler for `GET /health`.

use axum::Json;
use serde_json::{Value, json};

/// Liveness probe; does not touch the store.
pub async fn handler() -> Json<Value> { Json(json!({ "status": "healthy" })) }
