//! JSON REST API for Varinaut.
//!
//! Exposes an axum [`Router`] backed by any
//! [`varinaut_core::store::PredictionStore`]. CORS, tracing and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = varinaut_api::api_router(store.clone(), PagingConfig::default());
//! ```

pub mod error;
pub mod health;
pub mod predictions;

use std::sync::Arc;

use axum::{Router, routing::get};
use varinaut_core::store::{Page, PredictionStore};

pub use error::ApiError;

/// Page-size policy for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
  /// Used when the request omits `limit`.
  pub default_limit: u64,
  /// Requests above this are silently capped.
  pub max_limit:     u64,
}

impl Default for PagingConfig {
  fn default() -> Self {
    Self { default_limit: Page::DEFAULT_LIMIT, max_limit: 1000 }
  }
}

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub paging: PagingConfig,
}

// `S` itself need not be `Clone`.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), paging: self.paging }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, paging: PagingConfig) -> Router<()>
where
  S: PredictionStore + 'static,
{
  Router::new()
    .route("/predictions", get(predictions::list::<S>))
    .route("/predictions/", get(predictions::list::<S>))
    .route("/predictions/{id}", get(predictions::get_one::<S>))
    .route("/health", get(health::handler))
    .with_state(AppState { store, paging })
}

// ─── Integration tests ────────────────────────────────────────────────────────
