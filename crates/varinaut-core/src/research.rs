//! Research attached to a prediction: updates, their sources, and reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Probability, Result};

/// Reviewer name recorded when a review does not name one.
pub const DEFAULT_REVIEWER: &str = "reviewer";

// ─── PredictionUpdate ────────────────────────────────────────────────────────

/// A research snapshot for a prediction: a likelihood estimate plus the
/// sources that back it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionUpdate {
  pub id:            i64,
  pub prediction_id: i64,
  pub likelihood:    Option<Probability>,
  pub reasoning:     Option<String>,
  /// Loaded alongside the update, in insertion order.
  #[serde(default)]
  pub sources:       Vec<Source>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::PredictionStore::record_update`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUpdate {
  pub prediction_id: i64,
  pub likelihood:    Option<Probability>,
  pub reasoning:     Option<String>,
}

impl NewUpdate {
  pub fn new(prediction_id: i64) -> Self {
    Self { prediction_id, likelihood: None, reasoning: None }
  }

  /// Set the likelihood, validating the range.
  pub fn with_likelihood(mut self, likelihood: f64) -> Result<Self> {
    self.likelihood = Some(Probability::checked("likelihood", likelihood)?);
    Ok(self)
  }
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// A piece of cited evidence backing an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
  pub id:          i64,
  pub update_id:   i64,
  pub title:       String,
  pub url:         String,
  pub summary:     Option<String>,
  /// How credible the information is (0 = not at all, 1 = very).
  pub credibility: Probability,
  /// How much the information should move the likelihood.
  pub relevance:   Probability,
  pub reasoning:   Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::PredictionStore::add_source`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSource {
  pub update_id:   i64,
  pub title:       String,
  pub url:         String,
  pub summary:     Option<String>,
  pub credibility: Probability,
  pub relevance:   Probability,
  pub reasoning:   Option<String>,
}

impl NewSource {
  /// Build a source from raw scores, validating both.
  pub fn new(
    update_id: i64,
    title: impl Into<String>,
    url: impl Into<String>,
    credibility: f64,
    relevance: f64,
  ) -> Result<Self> {
    Ok(Self {
      update_id,
      title: title.into(),
      url: url.into(),
      summary: None,
      credibility: Probability::checked("credibility", credibility)?,
      relevance: Probability::checked("relevance", relevance)?,
      reasoning: None,
    })
  }

  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Validation("source title must not be empty".into()));
    }
    if self.url.trim().is_empty() {
      return Err(Error::Validation("source url must not be empty".into()));
    }
    Ok(())
  }
}

// ─── HumanReview ─────────────────────────────────────────────────────────────

/// A reviewer's verdict on an update.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewDecision {
  Accept,
  #[default]
  Challenge,
  Reject,
}

impl ReviewDecision {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownDecision(s.to_owned()))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanReview {
  pub id:         i64,
  pub update_id:  i64,
  pub name:       String,
  pub decision:   ReviewDecision,
  pub feedback:   String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::PredictionStore::record_review`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
  pub update_id: i64,
  #[serde(default = "default_reviewer")]
  pub name:      String,
  #[serde(default)]
  pub decision:  ReviewDecision,
  pub feedback:  String,
}

fn default_reviewer() -> String { DEFAULT_REVIEWER.to_owned() }

impl NewReview {
  /// A review by the default reviewer with the default decision.
  pub fn new(update_id: i64, feedback: impl Into<String>) -> Self {
    Self {
      update_id,
      name: default_reviewer(),
      decision: ReviewDecision::default(),
      feedback: feedback.into(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::Validation("reviewer name must not be empty".into()));
    }
    Ok(())
  }
}
