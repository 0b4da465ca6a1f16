//! Predictions: tracked forecast questions and their status lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a prediction sits in the research/review workflow.
///
/// ```text
/// draft ─► researching ─► pending_review ─► reviewed ─► resolved
///               ▲               │
///               └───────────────┘
/// ```
///
/// Older databases used `approved` for what is now `reviewed`; both parse to
/// [`PredictionStatus::Reviewed`], but only `reviewed` is ever written.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionStatus {
  #[default]
  Draft,
  Researching,
  PendingReview,
  #[serde(alias = "approved")]
  #[strum(to_string = "reviewed", serialize = "approved")]
  Reviewed,
  Resolved,
}

impl PredictionStatus {
  /// Parse a stored or user-supplied status string.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }

  /// Whether the workflow allows moving from `self` to `next`.
  ///
  /// The only backward edge is `pending_review → researching`, taken when a
  /// reviewer sends the research back. Nothing leaves `resolved`.
  pub fn can_transition_to(self, next: Self) -> bool {
    use PredictionStatus::*;
    matches!(
      (self, next),
      (Draft, Researching)
        | (Researching, PendingReview)
        | (PendingReview, Reviewed)
        | (PendingReview, Researching)
        | (Reviewed, Resolved)
    )
  }

  /// Check the edge, returning [`Error::InvalidTransition`] if it is not
  /// allowed.
  pub fn transition_to(self, next: Self) -> Result<Self> {
    if self.can_transition_to(next) {
      Ok(next)
    } else {
      Err(Error::InvalidTransition { from: self, to: next })
    }
  }

  pub fn is_resolved(self) -> bool { matches!(self, Self::Resolved) }
}

// ─── Prediction ──────────────────────────────────────────────────────────────

/// A tracked forecast question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
  pub id:              i64,
  pub question:        String,
  pub description:     Option<String>,
  pub status:          PredictionStatus,
  /// `Some` only once the prediction is resolved.
  pub outcome:         Option<bool>,
  /// The date by which the question is expected to be answerable.
  pub resolution_date: Option<NaiveDate>,
  pub require_review:  bool,
  pub resolved_at:     Option<DateTime<Utc>>,
  /// Server-assigned on insert.
  pub created_at:      DateTime<Utc>,
  /// Refreshed by the store on every mutation.
  pub updated_at:      DateTime<Utc>,
}

// ─── NewPrediction ───────────────────────────────────────────────────────────

/// Input to [`crate::store::PredictionStore::create_prediction`].
///
/// New predictions always start as [`PredictionStatus::Draft`] with no
/// outcome; timestamps and the id are assigned by the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPrediction {
  pub question:        String,
  pub description:     Option<String>,
  pub resolution_date: Option<NaiveDate>,
  #[serde(default)]
  pub require_review:  bool,
}

impl NewPrediction {
  pub fn new(question: impl Into<String>) -> Self {
    Self { question: question.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<()> {
    if self.question.trim().is_empty() {
      return Err(Error::Validation("question must not be empty".into()));
    }
    Ok(())
  }
}
