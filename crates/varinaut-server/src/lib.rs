//! HTTP server assembly for Varinaut.
//!
//! Wraps the [`varinaut_api`] router with CORS and request tracing, driven
//! by [`Settings`].

pub mod settings;

pub use settings::Settings;

use std::sync::Arc;

use anyhow::Context as _;
use axum::{Router, http::HeaderValue};
use tower_http::{
  cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
  trace::TraceLayer,
};
use varinaut_core::store::PredictionStore;

/// Build the full application router for `store`.
pub fn app<S>(settings: &Settings, store: Arc<S>) -> anyhow::Result<Router>
where
  S: PredictionStore + 'static,
{
  Ok(
    varinaut_api::api_router(store, settings.paging())
      .layer(cors_layer(&settings.cors_origins)?)
      .layer(TraceLayer::new_for_http()),
  )
}

/// Allow the configured origins with credentials. Methods and headers are
/// mirrored from the preflight request; `*` mirrors the origin.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
  let allow_origin = if origins.iter().any(|o| o == "*") {
    AllowOrigin::mirror_request()
  } else {
    let values = origins
      .iter()
      .map(|o| {
        HeaderValue::from_str(o)
          .with_context(|| format!("invalid CORS origin {o:?}"))
      })
      .collect::<anyhow::Result<Vec<_>>>()?;
    AllowOrigin::list(values)
  };

  Ok(
    CorsLayer::new()
      .allow_origin(allow_origin)
      .allow_methods(AllowMethods::mirror_request())
      .allow_headers(AllowHeaders::mirror_request())
      .allow_credentials(true),
  )
}

// ─── Integration tests ────────────────────────────────────────────────────────
