//! The `PredictionStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `varinaut-store-sqlite`). Higher layers (`varinaut-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  prediction::{NewPrediction, Prediction, PredictionStatus},
  research::{
    HumanReview, NewReview, NewSource, NewUpdate, PredictionUpdate, Source,
  },
};

// ─── Paging ──────────────────────────────────────────────────────────────────

/// Offset pagination over rows in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub skip:  u64,
  pub limit: u64,
}

impl Page {
  pub const DEFAULT_LIMIT: u64 = 100;

  pub fn new(skip: u64, limit: u64) -> Self { Self { skip, limit } }

  /// Cap `limit` at `max`.
  pub fn clamped(self, max: u64) -> Self {
    Self { skip: self.skip, limit: self.limit.min(max) }
  }
}

impl Default for Page {
  fn default() -> Self { Self { skip: 0, limit: Self::DEFAULT_LIMIT } }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Varinaut storage backend.
///
/// Every method is one unit of work: it either fully applies or leaves the
/// store untouched. Ids and timestamps are assigned by the store.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait PredictionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Predictions ───────────────────────────────────────────────────────

  /// Persist a new prediction in [`PredictionStatus::Draft`].
  fn create_prediction(
    &self,
    input: NewPrediction,
  ) -> impl Future<Output = Result<Prediction, Self::Error>> + Send + '_;

  /// Retrieve a prediction by id. Returns `None` if not found.
  fn get_prediction(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Prediction>, Self::Error>> + Send + '_;

  /// List predictions in id order, skipping `page.skip` rows and returning
  /// at most `page.limit`.
  fn list_predictions(
    &self,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Prediction>, Self::Error>> + Send + '_;

  /// Move a prediction along the workflow.
  ///
  /// Fails if the edge is not allowed by
  /// [`PredictionStatus::can_transition_to`], or if `next` is `Resolved`
  /// (use [`PredictionStore::resolve_prediction`]).
  fn transition_status(
    &self,
    id: i64,
    next: PredictionStatus,
  ) -> impl Future<Output = Result<Prediction, Self::Error>> + Send + '_;

  /// Resolve a reviewed prediction with its outcome.
  fn resolve_prediction(
    &self,
    id: i64,
    outcome: bool,
  ) -> impl Future<Output = Result<Prediction, Self::Error>> + Send + '_;

  /// Delete a prediction and, by cascade, all of its research. Returns
  /// whether a row was removed.
  fn delete_prediction(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Updates ───────────────────────────────────────────────────────────

  fn record_update(
    &self,
    input: NewUpdate,
  ) -> impl Future<Output = Result<PredictionUpdate, Self::Error>> + Send + '_;

  /// Retrieve an update together with its sources.
  fn get_update(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<PredictionUpdate>, Self::Error>>
  + Send
  + '_;

  /// All updates for a prediction, oldest first, each with its sources.
  fn list_updates(
    &self,
    prediction_id: i64,
  ) -> impl Future<Output = Result<Vec<PredictionUpdate>, Self::Error>> + Send + '_;

  /// Delete an update and, by cascade, its sources and reviews.
  fn delete_update(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Sources & reviews ─────────────────────────────────────────────────

  fn add_source(
    &self,
    input: NewSource,
  ) -> impl Future<Output = Result<Source, Self::Error>> + Send + '_;

  fn list_sources(
    &self,
    update_id: i64,
  ) -> impl Future<Output = Result<Vec<Source>, Self::Error>> + Send + '_;

  fn record_review(
    &self,
    input: NewReview,
  ) -> impl Future<Output = Result<HumanReview, Self::Error>> + Send + '_;

  fn list_reviews(
    &self,
    update_id: i64,
  ) -> impl Future<Output = Result<Vec<HumanReview>, Self::Error>> + Send + '_;
}
