//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`,
//! enums as their snake_case names, booleans as `0`/`1`.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use varinaut_core::{
  Probability,
  prediction::{Prediction, PredictionStatus},
  research::{HumanReview, PredictionUpdate, ReviewDecision, Source},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PREDICTION_COLUMNS: &str = "id, question, description, status, \
  outcome, resolution_date, require_review, resolved_at, created_at, \
  updated_at";

/// Raw values read directly from a `prediction` row.
pub struct RawPrediction {
  pub id:              i64,
  pub question:        String,
  pub description:     Option<String>,
  pub status:          String,
  pub outcome:         Option<bool>,
  pub resolution_date: Option<String>,
  pub require_review:  bool,
  pub resolved_at:     Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawPrediction {
  /// Read a row selected with [`PREDICTION_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      question:        row.get(1)?,
      description:     row.get(2)?,
      status:          row.get(3)?,
      outcome:         row.get(4)?,
      resolution_date: row.get(5)?,
      require_review:  row.get(6)?,
      resolved_at:     row.get(7)?,
      created_at:      row.get(8)?,
      updated_at:      row.get(9)?,
    })
  }

  pub fn into_prediction(self) -> Result<Prediction> {
    Ok(Prediction {
      id:              self.id,
      question:        self.question,
      description:     self.description,
      status:          PredictionStatus::parse(&self.status)?,
      outcome:         self.outcome,
      resolution_date: self
        .resolution_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      require_review:  self.require_review,
      resolved_at:     self.resolved_at.as_deref().map(decode_dt).transpose()?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const UPDATE_COLUMNS: &str =
  "id, prediction_id, likelihood, reasoning, created_at, updated_at";

/// Raw values read directly from a `predictionupdate` row.
pub struct RawUpdate {
  pub id:            i64,
  pub prediction_id: i64,
  pub likelihood:    Option<f64>,
  pub reasoning:     Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawUpdate {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      prediction_id: row.get(1)?,
      likelihood:    row.get(2)?,
      reasoning:     row.get(3)?,
      created_at:    row.get(4)?,
      updated_at:    row.get(5)?,
    })
  }

  /// Decode, attaching already-loaded `sources`.
  pub fn into_update(self, sources: Vec<Source>) -> Result<PredictionUpdate> {
    Ok(PredictionUpdate {
      id: self.id,
      prediction_id: self.prediction_id,
      likelihood: self
        .likelihood
        .map(|p| Probability::checked("likelihood", p))
        .transpose()?,
      reasoning: self.reasoning,
      sources,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const SOURCE_COLUMNS: &str = "id, update_id, title, url, summary, \
  credibility, relevance, reasoning, created_at, updated_at";

/// Raw values read directly from a `source` row.
pub struct RawSource {
  pub id:          i64,
  pub update_id:   i64,
  pub title:       String,
  pub url:         String,
  pub summary:     Option<String>,
  pub credibility: f64,
  pub relevance:   f64,
  pub reasoning:   Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawSource {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      update_id:   row.get(1)?,
      title:       row.get(2)?,
      url:         row.get(3)?,
      summary:     row.get(4)?,
      credibility: row.get(5)?,
      relevance:   row.get(6)?,
      reasoning:   row.get(7)?,
      created_at:  row.get(8)?,
      updated_at:  row.get(9)?,
    })
  }

  pub fn into_source(self) -> Result<Source> {
    Ok(Source {
      id:          self.id,
      update_id:   self.update_id,
      title:       self.title,
      url:         self.url,
      summary:     self.summary,
      credibility: Probability::checked("credibility", self.credibility)?,
      relevance:   Probability::checked("relevance", self.relevance)?,
      reasoning:   self.reasoning,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const REVIEW_COLUMNS: &str =
  "id, update_id, name, decision, feedback, created_at, updated_at";

/// Raw values read directly from a `humanreview` row.
pub struct RawReview {
  pub id:         i64,
  pub update_id:  i64,
  pub name:       String,
  pub decision:   String,
  pub feedback:   String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawReview {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      update_id:  row.get(1)?,
      name:       row.get(2)?,
      decision:   row.get(3)?,
      feedback:   row.get(4)?,
      created_at: row.get(5)?,
      updated_at: row.get(6)?,
    })
  }

  pub fn into_review(self) -> Result<HumanReview> {
    Ok(HumanReview {
      id:         self.id,
      update_id:  self.update_id,
      name:       self.name,
      decision:   ReviewDecision::parse(&self.decision)?,
      feedback:   self.feedback,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
